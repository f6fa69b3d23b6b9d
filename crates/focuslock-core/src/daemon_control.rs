use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::get_data_dir;

/// Runtime files of a background daemon
pub struct DaemonControl {
    data_dir: PathBuf,
}

impl DaemonControl {
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Control files under the default data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined
    pub fn from_default_dir() -> Result<Self> {
        Ok(Self::new(&get_data_dir()?))
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn pid_path(&self) -> PathBuf {
        self.data_dir.join("focuslock.pid")
    }

    #[must_use]
    pub fn sock_path(&self) -> PathBuf {
        self.data_dir.join("focuslock.sock")
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("focuslock.log")
    }

    /// PID of the background daemon, if a PID file exists
    ///
    /// # Errors
    ///
    /// Returns an error if the PID file exists but cannot be read or parsed
    pub fn read_pid(&self) -> Result<Option<u32>> {
        let path = self.pid_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pid = contents
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid PID file {}", path.display()))?;
        Ok(Some(pid))
    }

    /// Record the daemon PID
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory or PID file cannot be written
    pub fn write_pid(&self, pid: u32) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.pid_path(), pid.to_string())?;
        Ok(())
    }

    /// Remove the PID file and socket if present
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed
    pub fn remove_runtime_files(&self) -> Result<()> {
        for path in [self.pid_path(), self.sock_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
