use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use syncgate_core::config::Config;
use syncgate_core::orchestrator::{self, RunOptions};
use syncgate_core::types::RunOutcome;

pub fn run(
    root: &Path,
    job_name: &str,
    force: bool,
    max_attempts: Option<u32>,
    retry_delay: Option<u64>,
    json: bool,
) -> anyhow::Result<i32> {
    let config = Config::load(root).context("failed to load config")?;
    let job = config.find_job(job_name)?;

    let opts = RunOptions {
        force,
        max_attempts,
        retry_delay_seconds: retry_delay,
    };
    let report = orchestrator::run_job(root, job, &opts)?;

    if json {
        print_json(&report)?;
    } else {
        match report.outcome {
            RunOutcome::Acted => {
                let pattern = report
                    .pattern
                    .as_deref()
                    .map(|p| format!(" (pattern '{p}')"))
                    .unwrap_or_default();
                println!(
                    "{}: acted{} after {} attempt(s); watermark now {}",
                    report.job, pattern, report.attempts, report.signal
                );
            }
            RunOutcome::Skipped => {
                println!(
                    "{}: nothing new (signal {} has not advanced past the watermark)",
                    report.job, report.signal
                );
            }
        }
    }

    Ok(report.outcome.exit_code())
}
