mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, rotation::RotationSubcommand, watermark::WatermarkSubcommand};
use std::path::PathBuf;
use syncgate_core::SyncgateError;

#[derive(Parser)]
#[command(
    name = "syncgate",
    about = "Watermark-gated retry runner — gate unattended maintenance jobs on persisted signals",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .syncgate/ or .git/)
    #[arg(long, global = true, env = "SYNCGATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize syncgate in the current project
    Init,

    /// Run one gated job: wait for quiescence, evaluate the gate, act, commit
    Run {
        /// Job name from .syncgate/config.yaml
        job: String,

        /// Bypass the gate even if nothing changed (logged as an override)
        #[arg(long)]
        force: bool,

        /// Override the job's retry bound
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Override the job's inter-retry delay in seconds
        #[arg(long)]
        retry_delay: Option<u64>,
    },

    /// Inspect and repair stored watermarks
    Watermark {
        #[command(subcommand)]
        subcommand: WatermarkSubcommand,
    },

    /// Inspect and reset pattern-rotation state
    Rotation {
        #[command(subcommand)]
        subcommand: RotationSubcommand,
    },

    /// Validate the job configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Run {
            job,
            force,
            max_attempts,
            retry_delay,
        } => cmd::run::run(&root, &job, force, max_attempts, retry_delay, cli.json),
        Commands::Watermark { subcommand } => cmd::watermark::run(&root, subcommand, cli.json),
        Commands::Rotation { subcommand } => cmd::rotation::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    match result {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            let code = e
                .downcast_ref::<SyncgateError>()
                .map(SyncgateError::exit_code)
                .unwrap_or(2);
            std::process::exit(code);
        }
    }
}
