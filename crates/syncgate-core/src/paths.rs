use crate::error::{Result, SyncgateError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SYNCGATE_DIR: &str = ".syncgate";
pub const WATERMARKS_DIR: &str = ".syncgate/watermarks";
pub const ROTATION_DIR: &str = ".syncgate/rotation";

pub const CONFIG_FILE: &str = ".syncgate/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn syncgate_dir(root: &Path) -> PathBuf {
    root.join(SYNCGATE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn watermarks_dir(root: &Path) -> PathBuf {
    root.join(WATERMARKS_DIR)
}

pub fn watermark_path(root: &Path, check: &str) -> PathBuf {
    watermarks_dir(root).join(format!("{check}.yaml"))
}

pub fn rotation_dir(root: &Path) -> PathBuf {
    root.join(ROTATION_DIR)
}

pub fn rotation_path(root: &Path, job: &str) -> PathBuf {
    rotation_dir(root).join(format!("{job}.yaml"))
}

// ---------------------------------------------------------------------------
// Check-name validation
// ---------------------------------------------------------------------------

/// Check and job names become file names, so they are restricted to
/// lowercase alphanumerics and interior hyphens, max 64 chars.
pub fn validate_check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(SyncgateError::InvalidCheckName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
