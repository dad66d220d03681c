//! File system helpers for config and local state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils::error::Result;

const APP_DIR: &str = "prepx";

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {:?}", path),
        )
        .into());
    }
    Ok(())
}

/// Application data directory (`$DATA_DIR/prepx`). Not created.
pub fn app_data_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Could not find data directory"))?
        .join(APP_DIR);
    Ok(dir)
}

/// Application config directory (`$CONFIG_DIR/prepx`). Not created.
pub fn app_config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Could not find config directory"))?
        .join(APP_DIR);
    Ok(dir)
}
