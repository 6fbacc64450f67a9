use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use clap::Subcommand;
use std::path::Path;
use syncgate_core::types::Signal;
use syncgate_core::watermark::WatermarkStore;

#[derive(Subcommand)]
pub enum WatermarkSubcommand {
    /// List all stored watermarks
    List,

    /// Show one watermark
    Show { check: String },

    /// Set a watermark by hand (RFC 3339 timestamp or integer)
    Set { check: String, value: String },

    /// Remove a watermark so the next run acts unconditionally
    Clear { check: String },
}

pub fn run(root: &Path, subcommand: WatermarkSubcommand, json: bool) -> anyhow::Result<i32> {
    let store = WatermarkStore::open(root);

    match subcommand {
        WatermarkSubcommand::List => {
            let marks = store.list().context("failed to read watermarks")?;
            if json {
                print_json(&marks)?;
            } else if marks.is_empty() {
                println!("No watermarks stored.");
            } else {
                let rows = marks
                    .iter()
                    .map(|m| {
                        vec![
                            m.check.clone(),
                            m.value.to_string(),
                            m.recorded_at.to_rfc3339(),
                        ]
                    })
                    .collect();
                print_table(&["CHECK", "VALUE", "RECORDED"], rows);
            }
        }
        WatermarkSubcommand::Show { check } => {
            let Some(mark) = store.load(&check)? else {
                bail!("no watermark stored for '{check}'");
            };
            if json {
                print_json(&mark)?;
            } else {
                println!("{}: {} (recorded {})", mark.check, mark.value, mark.recorded_at);
            }
        }
        WatermarkSubcommand::Set { check, value } => {
            let Some(signal) = Signal::parse(&value) else {
                bail!("'{value}' is neither an RFC 3339 timestamp nor an integer");
            };
            let mark = store.save(&check, signal)?;
            if json {
                print_json(&mark)?;
            } else {
                println!("{}: watermark set to {}", mark.check, mark.value);
            }
        }
        WatermarkSubcommand::Clear { check } => {
            let removed = store.remove(&check)?;
            if removed {
                println!("{check}: watermark cleared");
            } else {
                println!("{check}: no watermark to clear");
            }
        }
    }
    Ok(0)
}
