//! Per-run log files.
//!
//! Each run gets a uniquely named file inside the log directory. Files are
//! never removed by the wrapper, so overlapping runs never share a file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A freshly created, persisted log file
pub struct LogFile {
    pub path: PathBuf,
    pub file: tokio::fs::File,
}

impl LogFile {
    /// Create the log directory if needed and a new unique file inside it
    pub async fn create(log_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let temp = tempfile::Builder::new()
            .prefix("cronalert-")
            .suffix(".log")
            .tempfile_in(log_dir)
            .with_context(|| format!("Failed to create log file in {}", log_dir.display()))?;

        let (file, path) = temp
            .keep()
            .context("Failed to persist log file")?;

        Ok(Self {
            path,
            file: tokio::fs::File::from_std(file),
        })
    }
}
