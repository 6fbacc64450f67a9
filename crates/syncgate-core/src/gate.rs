use crate::error::{Result, SyncgateError};
use crate::types::Signal;
use crate::watermark::Watermark;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Proceed { reason: ProceedReason },
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceedReason {
    /// Operator override; always logged, never a silent pass.
    Forced,
    /// No stored watermark yet.
    FirstRun,
    /// The fresh signal is strictly newer than the watermark.
    NewSignal,
}

impl GateDecision {
    pub fn proceeds(&self) -> bool {
        matches!(self, GateDecision::Proceed { .. })
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Decide whether the guarded action should run.
///
/// Strict greater-than: an unchanged signal must not proceed, so a run
/// immediately after a success is a no-op. A signal whose kind differs
/// from the stored watermark's is fatal rather than a silent skip.
pub fn evaluate(
    signal: Signal,
    watermark: Option<&Watermark>,
    force: bool,
) -> Result<GateDecision> {
    if force {
        tracing::warn!(%signal, "gate bypassed by force override");
        return Ok(GateDecision::Proceed {
            reason: ProceedReason::Forced,
        });
    }
    let Some(mark) = watermark else {
        tracing::info!(%signal, "no stored watermark, proceeding");
        return Ok(GateDecision::Proceed {
            reason: ProceedReason::FirstRun,
        });
    };
    let Some(order) = signal.compare(&mark.value) else {
        return Err(SyncgateError::SignalKindMismatch {
            name: mark.check.clone(),
            stored: mark.value.kind(),
            fresh: signal.kind(),
        });
    };
    if order == Ordering::Greater {
        tracing::info!(%signal, watermark = %mark.value, "signal advanced, proceeding");
        Ok(GateDecision::Proceed {
            reason: ProceedReason::NewSignal,
        })
    } else {
        tracing::info!(%signal, watermark = %mark.value, "nothing new since last run");
        Ok(GateDecision::Skip)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mark(value: Signal) -> Watermark {
        Watermark {
            check: "sync-check".to_string(),
            value,
            recorded_at: Utc::now(),
        }
    }

    fn ts(raw: &str) -> Signal {
        Signal::parse(raw).unwrap()
    }

    #[test]
    fn absent_watermark_proceeds() {
        let decision = evaluate(ts("2024-01-10T00:00:00Z"), None, false).unwrap();
        assert_eq!(
            decision,
            GateDecision::Proceed {
                reason: ProceedReason::FirstRun
            }
        );
    }

    #[test]
    fn newer_signal_proceeds() {
        let stored = mark(ts("2024-01-09T00:00:00Z"));
        let decision = evaluate(ts("2024-01-10T00:00:00Z"), Some(&stored), false).unwrap();
        assert_eq!(
            decision,
            GateDecision::Proceed {
                reason: ProceedReason::NewSignal
            }
        );
    }

    #[test]
    fn equal_signal_skips() {
        let stored = mark(ts("2024-01-10T00:00:00Z"));
        let decision = evaluate(ts("2024-01-10T00:00:00Z"), Some(&stored), false).unwrap();
        assert_eq!(decision, GateDecision::Skip);
    }

    #[test]
    fn older_signal_skips() {
        let stored = mark(Signal::Counter(10));
        let decision = evaluate(Signal::Counter(9), Some(&stored), false).unwrap();
        assert_eq!(decision, GateDecision::Skip);
    }

    #[test]
    fn force_overrides_even_when_stale() {
        let stored = mark(Signal::Counter(10));
        let decision = evaluate(Signal::Counter(1), Some(&stored), true).unwrap();
        assert_eq!(
            decision,
            GateDecision::Proceed {
                reason: ProceedReason::Forced
            }
        );
    }

    #[test]
    fn kind_mismatch_is_fatal() {
        let stored = mark(ts("2024-01-10T00:00:00Z"));
        assert!(matches!(
            evaluate(Signal::Counter(5), Some(&stored), false),
            Err(SyncgateError::SignalKindMismatch { .. })
        ));
    }
}
