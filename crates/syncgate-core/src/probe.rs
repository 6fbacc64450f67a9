//! Shell-command adapters for the external collaborators.
//!
//! Remote systems (sync engines, scheduled-task runners, deployment-rule
//! runners) are reached through operator-configured commands that print a
//! small payload to stdout:
//!
//! - signal command: an RFC 3339 timestamp or an integer
//! - status command: `busy` / `idle`, or `{"busy": <bool>}` JSON
//! - completion/confirm command: `{"completed_at": "<rfc3339>", "exit_code": <int>}`
//! - action command: side-effecting; success is exit code 0
//!
//! Commands run via `sh -c` with the project root as working directory and
//! `SYNCGATE_ROOT` exported. Stderr flows through to the parent process so
//! remote tool output lands in the scheduler's log.

use crate::error::{Result, SyncgateError};
use crate::poller::StatusProbe;
use crate::types::{CompletionRecord, QuiescenceStatus, Signal};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// Shell execution
// ---------------------------------------------------------------------------

/// Run `command` under `sh -c`, returning its exit code and captured stdout.
pub fn run_shell(root: &Path, command: &str) -> Result<(i32, String)> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(root)
        .env("SYNCGATE_ROOT", root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| SyncgateError::SpawnFailed(format!("{command}: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    // A missing code means the process died on a signal; -1 keeps it
    // distinguishable from any real result code.
    let code = output.status.code().unwrap_or(-1);
    Ok((code, stdout))
}

/// Verify that the program a command invokes can be found at all. Missing
/// tools are a fatal precondition failure, caught before any polling or
/// retrying starts.
pub fn require_program(command: &str) -> Result<()> {
    let Some(program) = command.split_whitespace().next() else {
        return Err(SyncgateError::InvalidConfig(
            "empty command".to_string(),
        ));
    };
    // Leading VAR=value assignments are handled by the shell, not us.
    if program.contains('=') {
        return Ok(());
    }
    if program.contains('/') {
        if !Path::new(program).exists() {
            return Err(SyncgateError::ProgramNotFound(program.to_string()));
        }
        return Ok(());
    }
    which::which(program)
        .map(|_| ())
        .map_err(|_| SyncgateError::ProgramNotFound(program.to_string()))
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BusyPayload {
    busy: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionPayload {
    completed_at: DateTime<Utc>,
    exit_code: i32,
}

fn parse_status(operation: &str, raw: &str) -> Result<QuiescenceStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "busy" => return Ok(QuiescenceStatus::Busy),
        "idle" => return Ok(QuiescenceStatus::Idle),
        _ => {}
    }
    let payload: BusyPayload =
        serde_json::from_str(raw.trim()).map_err(|_| SyncgateError::ProbeOutput {
            operation: operation.to_string(),
            detail: format!("expected 'busy', 'idle', or {{\"busy\": bool}}, got {raw:?}"),
        })?;
    Ok(if payload.busy {
        QuiescenceStatus::Busy
    } else {
        QuiescenceStatus::Idle
    })
}

fn parse_completion(operation: &str, raw: &str) -> Result<CompletionRecord> {
    let payload: CompletionPayload =
        serde_json::from_str(raw.trim()).map_err(|e| SyncgateError::ProbeOutput {
            operation: operation.to_string(),
            detail: format!("bad completion payload: {e}"),
        })?;
    Ok(CompletionRecord {
        completed_at: payload.completed_at,
        exit_code: payload.exit_code,
    })
}

// ---------------------------------------------------------------------------
// Signal fetch
// ---------------------------------------------------------------------------

/// Run the signal command and parse its stdout into a `Signal`. A non-zero
/// exit propagates the remote result code; unparseable output is fatal.
pub fn fetch_signal(root: &Path, operation: &str, command: &str) -> Result<Signal> {
    let (code, stdout) = run_shell(root, command)?;
    if code != 0 {
        return Err(SyncgateError::RemoteFailed {
            operation: operation.to_string(),
            code,
        });
    }
    Signal::parse(&stdout).ok_or_else(|| SyncgateError::ProbeOutput {
        operation: operation.to_string(),
        detail: format!("expected an RFC 3339 timestamp or integer, got {stdout:?}"),
    })
}

/// Run a completion/confirm command and parse its payload.
pub fn fetch_completion(root: &Path, operation: &str, command: &str) -> Result<CompletionRecord> {
    let (code, stdout) = run_shell(root, command)?;
    if code != 0 {
        return Err(SyncgateError::RemoteFailed {
            operation: operation.to_string(),
            code,
        });
    }
    parse_completion(operation, &stdout)
}

// ---------------------------------------------------------------------------
// CommandProbe
// ---------------------------------------------------------------------------

/// `StatusProbe` backed by a pair of shell commands.
pub struct CommandProbe {
    root: PathBuf,
    operation: String,
    status_command: String,
    completion_command: String,
}

impl CommandProbe {
    pub fn new(
        root: &Path,
        operation: impl Into<String>,
        status_command: impl Into<String>,
        completion_command: impl Into<String>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            operation: operation.into(),
            status_command: status_command.into(),
            completion_command: completion_command.into(),
        }
    }
}

impl StatusProbe for CommandProbe {
    fn status(&mut self) -> Result<QuiescenceStatus> {
        let (code, stdout) = run_shell(&self.root, &self.status_command)?;
        if code != 0 {
            return Err(SyncgateError::RemoteFailed {
                operation: self.operation.clone(),
                code,
            });
        }
        parse_status(&self.operation, &stdout)
    }

    fn last_completion(&mut self) -> Result<CompletionRecord> {
        fetch_completion(&self.root, &self.operation, &self.completion_command)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
