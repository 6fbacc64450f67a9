use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use syncgate_core::config::{Config, WarnLevel};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Parse the configuration and report problems
    Validate,

    /// Print the parsed configuration
    Show,
}

pub fn run(root: &Path, subcommand: ConfigSubcommand, json: bool) -> anyhow::Result<i32> {
    let config = Config::load(root).context("failed to load config")?;

    match subcommand {
        ConfigSubcommand::Validate => {
            let warnings = config.validate();
            if json {
                print_json(&warnings)?;
            } else if warnings.is_empty() {
                println!("Configuration OK ({} job(s))", config.jobs.len());
            } else {
                for w in &warnings {
                    let tag = match w.level {
                        WarnLevel::Error => "error",
                        WarnLevel::Warning => "warning",
                    };
                    println!("{tag}: {}", w.message);
                }
            }
            let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
            Ok(if has_errors { 2 } else { 0 })
        }
        ConfigSubcommand::Show => {
            if json {
                print_json(&config)?;
            } else {
                print!("{}", serde_yaml::to_string(&config)?);
            }
            Ok(0)
        }
    }
}
