use crate::error::{Result, SyncgateError};
use crate::io;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// RotationState
// ---------------------------------------------------------------------------

/// Which pattern a cyclic job used last time. `position` indexes into
/// `patterns`; the next run advances it by one, wrapping at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationState {
    pub patterns: Vec<String>,
    pub position: usize,
    pub updated_at: DateTime<Utc>,
}

/// Position to use this run. Starts over at 0 when there is no stored
/// state or when the configured pattern set has changed (compared as a
/// set — reordering alone does not reset the cycle).
pub fn next_position(stored: Option<&RotationState>, patterns: &[String]) -> usize {
    let Some(state) = stored else {
        return 0;
    };
    if patterns.is_empty() {
        return 0;
    }
    let stored_set: BTreeSet<&str> = state.patterns.iter().map(String::as_str).collect();
    let fresh_set: BTreeSet<&str> = patterns.iter().map(String::as_str).collect();
    if stored_set != fresh_set {
        return 0;
    }
    (state.position + 1) % patterns.len()
}

// ---------------------------------------------------------------------------
// RotationStore
// ---------------------------------------------------------------------------

/// Per-job rotation files under `.syncgate/rotation/`, persisted the same
/// way as watermarks.
#[derive(Debug, Clone)]
pub struct RotationStore {
    dir: PathBuf,
}

impl RotationStore {
    pub fn open(root: &Path) -> Self {
        Self {
            dir: paths::rotation_dir(root),
        }
    }

    fn path(&self, job: &str) -> PathBuf {
        self.dir.join(format!("{job}.yaml"))
    }

    pub fn load(&self, job: &str) -> Result<Option<RotationState>> {
        paths::validate_check_name(job)?;
        let path = self.path(job);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let state: RotationState =
            serde_yaml::from_str(&data).map_err(|e| SyncgateError::CorruptWatermark {
                name: job.to_string(),
                detail: e.to_string(),
            })?;
        Ok(Some(state))
    }

    pub fn save(&self, job: &str, patterns: &[String], position: usize) -> Result<RotationState> {
        paths::validate_check_name(job)?;
        let state = RotationState {
            patterns: patterns.to_vec(),
            position,
            updated_at: Utc::now(),
        };
        let data = serde_yaml::to_string(&state)?;
        io::atomic_write(&self.path(job), data.as_bytes())?;
        Ok(state)
    }

    pub fn remove(&self, job: &str) -> Result<bool> {
        paths::validate_check_name(job)?;
        let path = self.path(job);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
