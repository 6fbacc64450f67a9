use crate::error::{Result, SyncgateError};
use crate::io;
use crate::paths;
use crate::types::Signal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// The most recent signal value as of the last successful guarded action,
/// persisted per check name. Overwritten on each success, never deleted
/// automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Watermark {
    pub check: String,
    pub value: Signal,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// WatermarkStore
// ---------------------------------------------------------------------------

/// Flat per-check YAML files under `.syncgate/watermarks/`. Single writer,
/// single reader; callers are externally serialized by the scheduler.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    dir: PathBuf,
}

impl WatermarkStore {
    pub fn open(root: &Path) -> Self {
        Self {
            dir: paths::watermarks_dir(root),
        }
    }

    fn path(&self, check: &str) -> PathBuf {
        self.dir.join(format!("{check}.yaml"))
    }

    /// Load the watermark for `check`. A missing file is `Ok(None)` — the
    /// first-ever run. A file that exists but cannot be parsed is fatal:
    /// silently ignoring it could skip or duplicate a sync.
    pub fn load(&self, check: &str) -> Result<Option<Watermark>> {
        paths::validate_check_name(check)?;
        let path = self.path(check);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let mark: Watermark =
            serde_yaml::from_str(&data).map_err(|e| SyncgateError::CorruptWatermark {
                name: check.to_string(),
                detail: e.to_string(),
            })?;
        Ok(Some(mark))
    }

    /// Persist `value` as the new watermark for `check`. Only called after
    /// the guarded action has fully succeeded; a crash before this write
    /// causes a harmless re-run next time.
    pub fn save(&self, check: &str, value: Signal) -> Result<Watermark> {
        paths::validate_check_name(check)?;
        let mark = Watermark {
            check: check.to_string(),
            value,
            recorded_at: Utc::now(),
        };
        let data = serde_yaml::to_string(&mark)?;
        io::atomic_write(&self.path(check), data.as_bytes())?;
        Ok(mark)
    }

    /// All stored watermarks, sorted by check name.
    pub fn list(&self) -> Result<Vec<Watermark>> {
        let mut marks = Vec::new();
        if !self.dir.exists() {
            return Ok(marks);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(check) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(mark) = self.load(check)? {
                marks.push(mark);
            }
        }
        marks.sort_by(|a, b| a.check.cmp(&b.check));
        Ok(marks)
    }

    /// Remove the watermark for `check`. Returns true if one existed.
    pub fn remove(&self, check: &str) -> Result<bool> {
        paths::validate_check_name(check)?;
        let path = self.path(check);
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
