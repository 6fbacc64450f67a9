use crate::error::{Result, SyncgateError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Fixed-delay bounded retry. `max_attempts` counts invocations, so `3`
/// means up to three calls with two sleeps between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionError
// ---------------------------------------------------------------------------

/// How a guarded action failed. Retry-vs-abort is an explicit branch, not
/// an unwind: transient failures burn an attempt, fatal ones stop the run
/// immediately.
#[derive(Debug)]
pub enum ActionError {
    Transient(String),
    Fatal(SyncgateError),
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Invoke `action` up to `policy.max_attempts` times, sleeping
/// `policy.delay` between attempts.
///
/// The closure receives the 1-indexed attempt number and is entered fresh
/// on every attempt, so any time-based precondition it depends on (a
/// last-run baseline, for instance) is re-derived right before the remote
/// call rather than reused from a previous attempt.
pub fn execute<T>(
    operation: &str,
    policy: &RetryPolicy,
    mut action: impl FnMut(u32) -> std::result::Result<T, ActionError>,
) -> Result<T> {
    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match action(attempt) {
            Ok(value) => {
                tracing::info!(operation, attempt, "action succeeded");
                return Ok(value);
            }
            Err(ActionError::Fatal(err)) => {
                tracing::error!(operation, attempt, error = %err, "fatal failure, aborting");
                return Err(err);
            }
            Err(ActionError::Transient(detail)) => {
                tracing::warn!(operation, attempt, max_attempts, detail, "transient failure");
                if attempt < max_attempts {
                    std::thread::sleep(policy.delay);
                }
            }
        }
    }
    Err(SyncgateError::RetriesExhausted {
        operation: operation.to_string(),
        attempts: max_attempts,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
