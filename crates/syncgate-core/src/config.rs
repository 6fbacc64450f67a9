use crate::error::{Result, SyncgateError};
use crate::io;
use crate::paths;
use crate::poller::PollSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// QuiescenceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuiescenceConfig {
    /// Command printing `busy`/`idle` or `{"busy": bool}`.
    pub status: String,
    /// Command printing `{"completed_at": "<rfc3339>", "exit_code": <int>}`.
    pub completion: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default)]
    pub lead_time_seconds: u64,
    /// Overall bound on the quiescence wait. Absent = unbounded; the
    /// external scheduler is then responsible for wall-clock limits.
    #[serde(default)]
    pub max_wait_seconds: Option<u64>,
}

fn default_poll_interval() -> u64 {
    300
}

impl QuiescenceConfig {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_seconds),
            lead_time: Duration::from_secs(self.lead_time_seconds),
            deadline: self.max_wait_seconds.map(Duration::from_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// JobConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Job name; doubles as the watermark check name.
    pub name: String,
    /// Command printing the fresh signal (RFC 3339 timestamp or integer).
    pub signal: String,
    /// The guarded side-effecting command. May contain `{pattern}` when
    /// `patterns` is non-empty.
    pub action: String,
    /// Optional last-run probe: when set, each attempt snapshots it right
    /// before the action and requires `completed_at` to advance afterwards.
    #[serde(default)]
    pub confirm: Option<String>,
    #[serde(default)]
    pub quiescence: Option<QuiescenceConfig>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    /// Grace period between invoking the action and checking its outcome,
    /// for remote systems that need to settle.
    #[serde(default)]
    pub settle_seconds: u64,
    /// Rotation patterns; one is chosen cyclically per run.
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    30
}

impl JobConfig {
    /// The action command with the rotation pattern substituted in.
    pub fn action_command(&self, pattern: Option<&str>) -> String {
        match pattern {
            Some(p) => self.action.replace("{pattern}", p),
            None => self.action.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SyncgateError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn find_job(&self, name: &str) -> Result<&JobConfig> {
        self.jobs
            .iter()
            .find(|j| j.name == name)
            .ok_or_else(|| SyncgateError::JobNotFound(name.to_string()))
    }

    /// Boundary validation: errors make a job unrunnable, warnings are
    /// suspicious but tolerated.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for job in &self.jobs {
            let name = job.name.as_str();
            if paths::validate_check_name(name).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "job '{name}': name must be lowercase alphanumeric with hyphens"
                    ),
                });
            }
            if !seen.insert(name) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate job name '{name}'"),
                });
            }
            if job.signal.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("job '{name}': signal command is empty"),
                });
            }
            if job.action.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("job '{name}': action command is empty"),
                });
            }
            if !job.patterns.is_empty() && !job.action.contains("{pattern}") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "job '{name}': patterns configured but action has no {{pattern}} placeholder"
                    ),
                });
            }
            if job.max_attempts == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("job '{name}': max_attempts 0 is treated as 1"),
                });
            }
            if let Some(q) = &job.quiescence {
                if q.status.trim().is_empty() || q.completion.trim().is_empty() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("job '{name}': quiescence commands must be non-empty"),
                    });
                }
                if q.poll_interval_seconds == 0 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "job '{name}': poll_interval_seconds 0 will spin on the status probe"
                        ),
                    });
                }
            }
        }
        warnings
    }
}

/// Scaffold written by `syncgate init`.
pub const SAMPLE_CONFIG: &str = r#"# syncgate job definitions.
#
# Each job gates a side-effecting command on a persisted watermark: the job
# runs its action only when the fresh signal is strictly newer than the
# last committed one, optionally after waiting for a remote system to go
# idle. See 'syncgate run <name>'.
jobs:
  - name: sync-check
    # Prints the fresh signal: an RFC 3339 timestamp or an integer.
    signal: "date -u +%Y-%m-%dT%H:%M:%SZ"
    # The guarded action. Exit code 0 is success; anything else is retried.
    action: "true"
    # Optional: wait for a remote resource to go idle first.
    # quiescence:
    #   status: "my-tool sync-status"          # prints busy/idle
    #   completion: "my-tool last-sync-json"   # prints {"completed_at": ..., "exit_code": ...}
    #   poll_interval_seconds: 300
    #   lead_time_seconds: 60
    #   max_wait_seconds: null                 # unbounded by default
    max_attempts: 3
    retry_delay_seconds: 30
    # Optional: confirm the action by watching a last-run record advance.
    # confirm: "my-tool last-run-json"
    # settle_seconds: 120
    # Optional: cycle through patterns, substituted into '{pattern}'.
    # patterns: ["Workstations*", "Servers*"]
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
