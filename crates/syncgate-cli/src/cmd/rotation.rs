use crate::output::print_json;
use anyhow::bail;
use clap::Subcommand;
use std::path::Path;
use syncgate_core::rotation::RotationStore;

#[derive(Subcommand)]
pub enum RotationSubcommand {
    /// Show a job's rotation state
    Show { job: String },

    /// Reset a job's rotation so the next run starts at the first pattern
    Reset { job: String },
}

pub fn run(root: &Path, subcommand: RotationSubcommand, json: bool) -> anyhow::Result<i32> {
    let store = RotationStore::open(root);

    match subcommand {
        RotationSubcommand::Show { job } => {
            let Some(state) = store.load(&job)? else {
                bail!("no rotation state stored for '{job}'");
            };
            if json {
                print_json(&state)?;
            } else {
                let pattern = state
                    .patterns
                    .get(state.position)
                    .map(String::as_str)
                    .unwrap_or("?");
                println!(
                    "{job}: last used pattern {} of {} ('{pattern}')",
                    state.position + 1,
                    state.patterns.len(),
                );
            }
        }
        RotationSubcommand::Reset { job } => {
            let removed = store.remove(&job)?;
            if removed {
                println!("{job}: rotation reset");
            } else {
                println!("{job}: no rotation state to reset");
            }
        }
    }
    Ok(0)
}
