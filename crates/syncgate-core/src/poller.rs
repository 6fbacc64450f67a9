use crate::error::{Result, SyncgateError};
use crate::types::{CompletionRecord, QuiescenceStatus};
use chrono::Utc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// StatusProbe
// ---------------------------------------------------------------------------

/// A remote long-running resource that can be asked whether it is busy and,
/// once idle, what its last completed run looked like.
pub trait StatusProbe {
    fn status(&mut self) -> Result<QuiescenceStatus>;
    fn last_completion(&mut self) -> Result<CompletionRecord>;
}

// ---------------------------------------------------------------------------
// PollSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Fixed re-check interval while busy; no backoff.
    pub interval: Duration,
    /// Do not trust a completion until this much time has passed since
    /// `completed_at` — absorbs clock skew and just-finished races.
    pub lead_time: Duration,
    /// Overall wall-clock bound. `None` preserves the historical unbounded
    /// behavior and leaves enforcement to the external scheduler.
    pub deadline: Option<Duration>,
}

// ---------------------------------------------------------------------------
// wait_until_idle
// ---------------------------------------------------------------------------

/// Block until the resource is idle and its last completion is both
/// trustworthy (lead time elapsed) and successful.
///
/// A completion with a non-zero result code is fatal: a failed remote run
/// must never be treated as "new enough to proceed".
pub fn wait_until_idle(
    operation: &str,
    probe: &mut dyn StatusProbe,
    settings: &PollSettings,
) -> Result<CompletionRecord> {
    let started = Instant::now();
    loop {
        if let Some(deadline) = settings.deadline {
            if started.elapsed() >= deadline {
                return Err(SyncgateError::DeadlineExceeded {
                    operation: operation.to_string(),
                    waited_seconds: started.elapsed().as_secs(),
                });
            }
        }

        match probe.status()? {
            QuiescenceStatus::Busy => {
                tracing::info!(
                    operation,
                    interval_seconds = settings.interval.as_secs_f64(),
                    "resource busy, waiting"
                );
                std::thread::sleep(settings.interval);
                continue;
            }
            QuiescenceStatus::Idle => {}
        }

        let record = probe.last_completion()?;

        if !settings.lead_time.is_zero() {
            let age = Utc::now().signed_duration_since(record.completed_at);
            let lead = chrono::Duration::from_std(settings.lead_time)
                .unwrap_or(chrono::Duration::MAX);
            if age < lead {
                tracing::info!(
                    operation,
                    completed_at = %record.completed_at,
                    "completion too recent, waiting out lead time"
                );
                std::thread::sleep(settings.interval);
                continue;
            }
        }

        if !record.succeeded() {
            tracing::error!(
                operation,
                code = record.exit_code,
                completed_at = %record.completed_at,
                "last remote run failed"
            );
            return Err(SyncgateError::RemoteFailed {
                operation: operation.to_string(),
                code: record.exit_code,
            });
        }

        tracing::info!(operation, completed_at = %record.completed_at, "resource idle");
        return Ok(record);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
