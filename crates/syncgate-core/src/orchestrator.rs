use crate::config::JobConfig;
use crate::error::{Result, SyncgateError};
use crate::gate::{self, GateDecision, ProceedReason};
use crate::paths;
use crate::poller;
use crate::probe::{self, CommandProbe};
use crate::retry::{self, ActionError, RetryPolicy};
use crate::rotation::{self, RotationStore};
use crate::types::{RunOutcome, Signal};
use crate::watermark::WatermarkStore;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// The orchestrator's run states, in order. `Aborted` is reachable from
/// every non-terminal state on fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    WaitingForQuiescence,
    Evaluating,
    Acting,
    Committing,
    Done,
    Aborted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::WaitingForQuiescence => "waiting_for_quiescence",
            RunState::Evaluating => "evaluating",
            RunState::Acting => "acting",
            RunState::Committing => "committing",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// RunOptions / RunReport
// ---------------------------------------------------------------------------

/// Command-line overrides; flags take precedence over the job config.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub force: bool,
    pub max_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub job: String,
    pub outcome: RunOutcome,
    pub reason: Option<ProceedReason>,
    pub signal: Signal,
    pub previous: Option<Signal>,
    pub attempts: u32,
    pub pattern: Option<String>,
}

// ---------------------------------------------------------------------------
// run_job
// ---------------------------------------------------------------------------

/// Execute one gated job end to end: wait for quiescence, compare the
/// fresh signal against the stored watermark, run the guarded action under
/// the retry bound, then commit the new watermark (and rotation position).
pub fn run_job(root: &Path, job: &JobConfig, opts: &RunOptions) -> Result<RunReport> {
    run_job_inner(root, job, opts).inspect_err(|err| {
        tracing::error!(job = %job.name, state = %RunState::Aborted, error = %err, "run aborted");
    })
}

fn enter(job: &str, state: RunState) {
    tracing::info!(job, state = %state, "state transition");
}

fn run_job_inner(root: &Path, job: &JobConfig, opts: &RunOptions) -> Result<RunReport> {
    paths::validate_check_name(&job.name)?;
    enter(&job.name, RunState::Idle);

    // Missing tools abort before any polling or retrying starts.
    probe::require_program(&job.signal)?;
    probe::require_program(&job.action)?;
    if let Some(confirm) = &job.confirm {
        probe::require_program(confirm)?;
    }
    if let Some(q) = &job.quiescence {
        probe::require_program(&q.status)?;
        probe::require_program(&q.completion)?;
    }

    if let Some(q) = &job.quiescence {
        enter(&job.name, RunState::WaitingForQuiescence);
        let mut status_probe = CommandProbe::new(root, job.name.clone(), &q.status, &q.completion);
        poller::wait_until_idle(&job.name, &mut status_probe, &q.poll_settings())?;
    }

    enter(&job.name, RunState::Evaluating);
    let signal = probe::fetch_signal(root, &job.name, &job.signal)?;
    let store = WatermarkStore::open(root);
    let previous = store.load(&job.name)?;
    let decision = gate::evaluate(signal, previous.as_ref(), opts.force)?;

    let GateDecision::Proceed { reason } = decision else {
        enter(&job.name, RunState::Done);
        return Ok(RunReport {
            job: job.name.clone(),
            outcome: RunOutcome::Skipped,
            reason: None,
            signal,
            previous: previous.map(|m| m.value),
            attempts: 0,
            pattern: None,
        });
    };

    // Pick the rotation pattern before acting; its position commits only
    // after the action succeeds, so a failed run repeats the same pattern.
    let pattern = if job.patterns.is_empty() {
        None
    } else {
        let rotation_store = RotationStore::open(root);
        let stored = rotation_store.load(&job.name)?;
        let position = rotation::next_position(stored.as_ref(), &job.patterns);
        Some((position, job.patterns[position].clone()))
    };

    enter(&job.name, RunState::Acting);
    let policy = RetryPolicy::new(
        opts.max_attempts.unwrap_or(job.max_attempts).max(1),
        Duration::from_secs(opts.retry_delay_seconds.unwrap_or(job.retry_delay_seconds)),
    );
    let action_command = job.action_command(pattern.as_ref().map(|(_, p)| p.as_str()));
    let settle = Duration::from_secs(job.settle_seconds);

    let attempts = retry::execute(&job.name, &policy, |attempt| {
        run_attempt(root, job, &action_command, settle).map(|()| attempt)
    })?;

    enter(&job.name, RunState::Committing);
    if let Some((position, _)) = &pattern {
        RotationStore::open(root).save(&job.name, &job.patterns, *position)?;
    }
    store.save(&job.name, signal)?;

    enter(&job.name, RunState::Done);
    Ok(RunReport {
        job: job.name.clone(),
        outcome: RunOutcome::Acted,
        reason: Some(reason),
        signal,
        previous: previous.map(|m| m.value),
        attempts,
        pattern: pattern.map(|(_, p)| p),
    })
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// One guarded attempt. With a confirm probe configured, the baseline is
/// re-fetched here, immediately before invoking the action — a retry that
/// reused the previous attempt's baseline could misread an old completion
/// as new.
fn run_attempt(
    root: &Path,
    job: &JobConfig,
    action_command: &str,
    settle: Duration,
) -> std::result::Result<(), ActionError> {
    let baseline = match &job.confirm {
        Some(confirm) => {
            Some(probe::fetch_completion(root, &job.name, confirm).map_err(transient_or_fatal)?)
        }
        None => None,
    };

    let (code, _) = probe::run_shell(root, action_command).map_err(ActionError::Fatal)?;
    if code != 0 {
        return Err(ActionError::Transient(format!(
            "action exited with code {code}"
        )));
    }

    let Some(confirm) = &job.confirm else {
        return Ok(());
    };

    if !settle.is_zero() {
        tracing::info!(job = %job.name, settle_seconds = settle.as_secs(), "settling");
        std::thread::sleep(settle);
    }

    let record = probe::fetch_completion(root, &job.name, confirm).map_err(transient_or_fatal)?;
    let baseline = baseline.unwrap_or(record);
    if record.completed_at <= baseline.completed_at {
        return Err(ActionError::Transient(
            "last run time did not advance after the action".to_string(),
        ));
    }
    if !record.succeeded() {
        return Err(ActionError::Transient(format!(
            "action run completed with result code {}",
            record.exit_code
        )));
    }
    Ok(())
}

/// Non-zero result codes from probe commands are temporary remote trouble
/// and burn an attempt; everything else (spawn failures, unusable output,
/// corrupt state) aborts the run.
fn transient_or_fatal(err: SyncgateError) -> ActionError {
    match err {
        SyncgateError::RemoteFailed { .. } => ActionError::Transient(err.to_string()),
        other => ActionError::Fatal(other),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuiescenceConfig;
    use tempfile::TempDir;

    fn job(name: &str, signal: &str, action: &str) -> JobConfig {
        JobConfig {
            name: name.to_string(),
            signal: signal.to_string(),
            action: action.to_string(),
            confirm: None,
            quiescence: None,
            max_attempts: 3,
            retry_delay_seconds: 0,
            settle_seconds: 0,
            patterns: Vec::new(),
        }
    }

    #[test]
    fn first_run_acts_and_commits_watermark() {
        let dir = TempDir::new().unwrap();
        let job = job("sync-check", "echo 2024-01-10T00:00:00Z", "true");
        let report = run_job(dir.path(), &job, &RunOptions::default()).unwrap();

        assert_eq!(report.outcome, RunOutcome::Acted);
        assert_eq!(report.reason, Some(ProceedReason::FirstRun));
        assert_eq!(report.attempts, 1);

        let mark = WatermarkStore::open(dir.path())
            .load("sync-check")
            .unwrap()
            .unwrap();
        assert_eq!(mark.value, Signal::parse("2024-01-10T00:00:00Z").unwrap());
    }

    #[test]
    fn unchanged_signal_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let job = job("sync-check", "echo 2024-01-10T00:00:00Z", "true");
        run_job(dir.path(), &job, &RunOptions::default()).unwrap();

        let report = run_job(dir.path(), &job, &RunOptions::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Skipped);
        assert_eq!(report.attempts, 0);
        assert_eq!(report.outcome.exit_code(), 1);
    }

    #[test]
    fn force_runs_despite_unchanged_signal() {
        let dir = TempDir::new().unwrap();
        let job = job("sync-check", "echo 2024-01-10T00:00:00Z", "true");
        run_job(dir.path(), &job, &RunOptions::default()).unwrap();

        let opts = RunOptions {
            force: true,
            ..Default::default()
        };
        let report = run_job(dir.path(), &job, &opts).unwrap();
        assert_eq!(report.outcome, RunOutcome::Acted);
        assert_eq!(report.reason, Some(ProceedReason::Forced));
    }

    #[test]
    fn failing_action_exhausts_attempts_and_leaves_no_watermark() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("calls");
        let action = format!("echo x >> {} && false", marker.display());
        let job = job("sync-check", "echo 5", &action);

        let result = run_job(dir.path(), &job, &RunOptions::default());
        assert!(matches!(
            result,
            Err(SyncgateError::RetriesExhausted { attempts: 3, .. })
        ));
        let calls = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(calls.lines().count(), 3);
        assert!(WatermarkStore::open(dir.path())
            .load("sync-check")
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_program_aborts_without_attempts() {
        let dir = TempDir::new().unwrap();
        let job = job("sync-check", "echo 1", "no-such-tool-exists-here --go");
        assert!(matches!(
            run_job(dir.path(), &job, &RunOptions::default()),
            Err(SyncgateError::ProgramNotFound(_))
        ));
    }

    #[test]
    fn rotation_advances_only_on_success() {
        let dir = TempDir::new().unwrap();
        let used = dir.path().join("used");
        let mut j = job("adr-run", "date -u +%s%N", "echo '{pattern}' >> used");
        j.patterns = vec!["alpha".to_string(), "beta".to_string()];

        run_job(dir.path(), &j, &RunOptions::default()).unwrap();
        run_job(dir.path(), &j, &RunOptions::default()).unwrap();
        run_job(dir.path(), &j, &RunOptions::default()).unwrap();

        let content = std::fs::read_to_string(&used).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["alpha", "beta", "alpha"]);
    }

    #[test]
    fn rotation_resets_when_patterns_change() {
        let dir = TempDir::new().unwrap();
        let mut j = job("adr-run", "date -u +%s%N", "echo '{pattern}' >> used");
        j.patterns = vec!["alpha".to_string(), "beta".to_string()];
        run_job(dir.path(), &j, &RunOptions::default()).unwrap();

        j.patterns = vec!["alpha".to_string(), "gamma".to_string()];
        let report = run_job(dir.path(), &j, &RunOptions::default()).unwrap();
        assert_eq!(report.pattern.as_deref(), Some("alpha"));
    }

    #[test]
    fn confirm_must_advance_or_attempt_is_retried() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("calls");
        // The confirm record never advances, so every attempt is transient
        // and the bound is exhausted.
        let mut j = job(
            "adr-run",
            "echo 9",
            &format!("echo x >> {}", marker.display()),
        );
        j.confirm =
            Some("echo '{\"completed_at\": \"2024-01-10T00:00:00Z\", \"exit_code\": 0}'".to_string());
        j.max_attempts = 2;

        let result = run_job(dir.path(), &j, &RunOptions::default());
        assert!(matches!(
            result,
            Err(SyncgateError::RetriesExhausted { attempts: 2, .. })
        ));
        let calls = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(calls.lines().count(), 2);
    }

    #[test]
    fn confirm_result_code_failure_is_retried() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("calls");
        // The confirm record advances on every fetch but always carries a
        // non-zero result code: a completed-but-failed run burns an attempt
        // just like one that never completed.
        let mut j = job(
            "adr-run",
            "echo 9",
            &format!("echo x >> {}", marker.display()),
        );
        j.confirm = Some(
            "printf '{\"completed_at\": \"%s\", \"exit_code\": 5}' \"$(date -u +%Y-%m-%dT%H:%M:%S.%NZ)\""
                .to_string(),
        );
        j.max_attempts = 2;

        let result = run_job(dir.path(), &j, &RunOptions::default());
        assert!(matches!(
            result,
            Err(SyncgateError::RetriesExhausted { attempts: 2, .. })
        ));
        let calls = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(calls.lines().count(), 2);
        assert!(WatermarkStore::open(dir.path())
            .load("adr-run")
            .unwrap()
            .is_none());
    }

    #[test]
    fn confirm_advance_succeeds() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stamp"), "2024-01-10T00:00:00Z").unwrap();
        let mut j = job(
            "adr-run",
            "echo 9",
            "date -u +%Y-%m-%dT%H:%M:%SZ > stamp",
        );
        j.confirm = Some(
            "printf '{\"completed_at\": \"%s\", \"exit_code\": 0}' \"$(cat stamp)\"".to_string(),
        );

        let report = run_job(dir.path(), &j, &RunOptions::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Acted);
    }

    #[test]
    fn quiescence_failure_aborts_before_acting() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("acted");
        let mut j = job("sync-check", "echo 1", &format!("touch {}", marker.display()));
        j.quiescence = Some(QuiescenceConfig {
            status: "echo idle".to_string(),
            completion: "echo '{\"completed_at\": \"2024-01-10T00:00:00Z\", \"exit_code\": 1601}'"
                .to_string(),
            poll_interval_seconds: 0,
            lead_time_seconds: 0,
            max_wait_seconds: None,
        });

        let result = run_job(dir.path(), &j, &RunOptions::default());
        assert!(matches!(
            result,
            Err(SyncgateError::RemoteFailed { code: 1601, .. })
        ));
        assert!(!marker.exists(), "action must not run after failed quiescence");
    }

    #[test]
    fn quiescence_success_lets_the_run_proceed() {
        let dir = TempDir::new().unwrap();
        let mut j = job("sync-check", "echo 1", "true");
        j.quiescence = Some(QuiescenceConfig {
            status: "echo idle".to_string(),
            completion: "echo '{\"completed_at\": \"2024-01-10T00:00:00Z\", \"exit_code\": 0}'"
                .to_string(),
            poll_interval_seconds: 0,
            lead_time_seconds: 0,
            max_wait_seconds: Some(5),
        });

        let report = run_job(dir.path(), &j, &RunOptions::default()).unwrap();
        assert_eq!(report.outcome, RunOutcome::Acted);
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("calls");
        let action = format!("echo x >> {} && false", marker.display());
        let mut j = job("sync-check", "echo 5", &action);
        j.max_attempts = 5;

        let opts = RunOptions {
            force: false,
            max_attempts: Some(1),
            retry_delay_seconds: Some(0),
        };
        let result = run_job(dir.path(), &j, &opts);
        assert!(matches!(
            result,
            Err(SyncgateError::RetriesExhausted { attempts: 1, .. })
        ));
        let calls = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(calls.lines().count(), 1);
    }
}
