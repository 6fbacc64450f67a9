use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncgateError {
    #[error("not initialized: run 'syncgate init'")]
    NotInitialized,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid check name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidCheckName(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("watermark '{name}' exists but cannot be read: {detail}")]
    CorruptWatermark { name: String, detail: String },

    #[error("signal kind mismatch for '{name}': stored {stored}, fresh {fresh}")]
    SignalKindMismatch {
        name: String,
        stored: &'static str,
        fresh: &'static str,
    },

    #[error("required program not found: {0}")]
    ProgramNotFound(String),

    #[error("failed to spawn command: {0}")]
    SpawnFailed(String),

    #[error("unusable output from {operation}: {detail}")]
    ProbeOutput { operation: String, detail: String },

    #[error("{operation} reported failure (result code {code})")]
    RemoteFailed { operation: String, code: i32 },

    #[error("{operation} still failing after {attempts} attempts")]
    RetriesExhausted { operation: String, attempts: u32 },

    #[error("{operation} did not become idle within {waited_seconds}s")]
    DeadlineExceeded {
        operation: String,
        waited_seconds: u64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SyncgateError {
    /// Process exit code for this error. Remote result codes propagate
    /// verbatim so calling pipelines can branch on them; everything else
    /// maps to 2, leaving 1 free for the gate's no-op outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncgateError::RemoteFailed { code, .. } if *code != 0 => *code,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncgateError>;
