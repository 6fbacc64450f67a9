use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// A point-in-time value retrieved from an external system: either the
/// moment something last happened or a monotonic counter. Signals of the
/// same kind are totally ordered; kinds never compare against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Signal {
    Timestamp(DateTime<Utc>),
    Counter(i64),
}

impl Signal {
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Timestamp(_) => "timestamp",
            Signal::Counter(_) => "counter",
        }
    }

    /// Parse a probe's stdout: an RFC 3339 timestamp or a plain integer.
    pub fn parse(raw: &str) -> Option<Signal> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(Signal::Timestamp(ts.with_timezone(&Utc)));
        }
        trimmed.parse::<i64>().ok().map(Signal::Counter)
    }

    /// Same-kind comparison; `None` when the kinds differ.
    pub fn compare(&self, other: &Signal) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Signal::Timestamp(a), Signal::Timestamp(b)) => Some(a.cmp(b)),
            (Signal::Counter(a), Signal::Counter(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Signal::Counter(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quiescence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuiescenceStatus {
    Busy,
    Idle,
}

/// The last completed run of a remote operation, as reported once the
/// resource is idle. A non-zero `exit_code` means the run finished but
/// failed, which callers must treat as fatal rather than "recent enough".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub completed_at: DateTime<Utc>,
    pub exit_code: i32,
}

impl CompletionRecord {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// Terminal outcome of a successful orchestrator run. Fatal errors never
/// reach this type; they surface as `SyncgateError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The gate opened and the guarded action completed.
    Acted,
    /// Nothing new since the stored watermark; the action was not run.
    Skipped,
}

impl RunOutcome {
    /// `0` for an acted run, `1` for the designated no-op outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Acted => 0,
            RunOutcome::Skipped => 1,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Acted => write!(f, "acted"),
            RunOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn parse_timestamp() {
        let sig = Signal::parse("2024-01-10T00:00:00Z").unwrap();
        assert_eq!(sig.kind(), "timestamp");
        assert_eq!(sig.to_string(), "2024-01-10T00:00:00+00:00");
    }

    #[test]
    fn parse_counter() {
        assert_eq!(Signal::parse("42\n"), Some(Signal::Counter(42)));
        assert_eq!(Signal::parse("-3"), Some(Signal::Counter(-3)));
    }

    #[test]
    fn parse_garbage_is_none() {
        assert_eq!(Signal::parse(""), None);
        assert_eq!(Signal::parse("yesterday"), None);
        assert_eq!(Signal::parse("2024-01-10"), None);
    }

    #[test]
    fn same_kind_comparison() {
        let older = Signal::parse("2024-01-09T00:00:00Z").unwrap();
        let newer = Signal::parse("2024-01-10T00:00:00Z").unwrap();
        assert_eq!(newer.compare(&older), Some(Ordering::Greater));
        assert_eq!(older.compare(&older), Some(Ordering::Equal));
        assert_eq!(
            Signal::Counter(5).compare(&Signal::Counter(7)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn cross_kind_comparison_is_none() {
        let ts = Signal::parse("2024-01-10T00:00:00Z").unwrap();
        assert_eq!(ts.compare(&Signal::Counter(1)), None);
    }

    #[test]
    fn signal_yaml_roundtrip() {
        let sig = Signal::Counter(1200);
        let yaml = serde_yaml::to_string(&sig).unwrap();
        assert!(yaml.contains("type: counter"));
        let parsed: Signal = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn completion_record_success() {
        let rec = CompletionRecord {
            completed_at: Utc::now(),
            exit_code: 0,
        };
        assert!(rec.succeeded());
        let failed = CompletionRecord {
            exit_code: 1601,
            ..rec
        };
        assert!(!failed.succeeded());
    }

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(RunOutcome::Acted.exit_code(), 0);
        assert_eq!(RunOutcome::Skipped.exit_code(), 1);
    }
}
