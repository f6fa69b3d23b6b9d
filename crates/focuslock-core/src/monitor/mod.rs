use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

/// Foreground window as reported by the window manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub title: String,
    pub process_name: String,
    pub path: String,
}

/// System monitor trait for platform-specific implementations
#[async_trait]
pub trait SystemMonitor: Send + Sync {
    /// Get the focused window, or `None` if nothing is focused or access is denied
    async fn get_active_window(&self) -> Result<Option<ActiveWindow>>;

    /// Get current idle time in seconds
    async fn get_idle_seconds(&self) -> Result<u32>;

    /// Check if system is idle
    async fn is_idle(&self, threshold_seconds: u32) -> Result<bool> {
        Ok(self.get_idle_seconds().await? >= threshold_seconds)
    }
}

/// Create platform-specific monitor
///
/// # Errors
///
/// Returns an error if the current platform is not supported or if monitor initialization fails
pub fn create_monitor() -> Result<Box<dyn SystemMonitor>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::MacOSMonitor::new()?))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::LinuxMonitor::new()?))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}
