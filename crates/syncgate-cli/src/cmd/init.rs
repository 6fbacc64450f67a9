use anyhow::Context;
use std::path::Path;
use syncgate_core::{config, io, paths};

pub fn run(root: &Path) -> anyhow::Result<i32> {
    io::ensure_dir(&paths::syncgate_dir(root)).context("failed to create .syncgate/")?;
    io::ensure_dir(&paths::watermarks_dir(root))?;
    io::ensure_dir(&paths::rotation_dir(root))?;

    let written = io::write_if_missing(
        &paths::config_path(root),
        config::SAMPLE_CONFIG.as_bytes(),
    )
    .context("failed to write config")?;

    if written {
        println!("Initialized syncgate in {}", root.display());
        println!("Edit {} to define jobs.", paths::CONFIG_FILE);
    } else {
        println!("syncgate already initialized in {}", root.display());
    }
    Ok(0)
}
