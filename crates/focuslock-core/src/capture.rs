use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::command::{run_checked, run_status, COMMAND_TIMEOUT};
use crate::config::PresenceConfig;

/// Source of raw face-presence readings (camera + detector)
#[async_trait]
pub trait PresenceSource: Send {
    /// Open the capture device
    async fn acquire(&mut self) -> Result<()>;

    /// Close the capture device
    async fn release(&mut self) -> Result<()>;

    /// Whether a face is currently visible
    async fn is_present(&mut self) -> Result<bool>;
}

/// Used when no presence probe is configured
pub struct AlwaysPresent;

#[async_trait]
impl PresenceSource for AlwaysPresent {
    async fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        Ok(())
    }

    async fn is_present(&mut self) -> Result<bool> {
        Ok(true)
    }
}

/// Presence detected by an external probe command.
///
/// Exit status 0 means a face is visible. Optional acquire/release commands
/// open and close the camera around the probe. Every command is bounded; a
/// probe that overruns `probe_timeout` is killed and reported as an error.
pub struct CommandPresence {
    probe: Vec<String>,
    acquire: Option<Vec<String>>,
    release: Option<Vec<String>>,
    probe_timeout: Duration,
}

impl CommandPresence {
    #[must_use]
    pub fn new(
        probe: Vec<String>,
        acquire: Option<Vec<String>>,
        release: Option<Vec<String>>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            probe,
            acquire,
            release,
            probe_timeout,
        }
    }
}

#[async_trait]
impl PresenceSource for CommandPresence {
    async fn acquire(&mut self) -> Result<()> {
        match &self.acquire {
            Some(argv) => run_checked(argv, COMMAND_TIMEOUT).await,
            None => Ok(()),
        }
    }

    async fn release(&mut self) -> Result<()> {
        match &self.release {
            Some(argv) => run_checked(argv, COMMAND_TIMEOUT).await,
            None => Ok(()),
        }
    }

    async fn is_present(&mut self) -> Result<bool> {
        Ok(run_status(&self.probe, self.probe_timeout).await?.success())
    }
}

/// Build the presence source described by the config
#[must_use]
pub fn create_presence_source(
    config: &PresenceConfig,
    probe_timeout: Duration,
) -> Box<dyn PresenceSource> {
    match &config.command {
        Some(probe) => Box::new(CommandPresence::new(
            probe.clone(),
            config.acquire_command.clone(),
            config.release_command.clone(),
            probe_timeout,
        )),
        None => {
            log::info!("No presence probe configured, assuming user is present");
            Box::new(AlwaysPresent)
        }
    }
}

/// Scoped hold on the capture device.
///
/// Owners release explicitly on suspend and shutdown. If the guard is dropped
/// while still held, the release is handed to the running tokio runtime so an
/// early return or panic does not leave the camera held.
pub struct CaptureGuard {
    source: Box<dyn PresenceSource>,
    held: bool,
}

impl CaptureGuard {
    pub async fn acquire(source: Box<dyn PresenceSource>) -> Self {
        let mut guard = Self {
            source,
            held: false,
        };
        guard.try_acquire().await;
        guard
    }

    async fn try_acquire(&mut self) {
        match self.source.acquire().await {
            Ok(()) => self.held = true,
            Err(e) => log::warn!("Failed to acquire presence capture: {e:#}"),
        }
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Release the device now instead of waiting for drop
    pub async fn release(&mut self) {
        if self.held {
            self.held = false;
            if let Err(e) = self.source.release().await {
                log::warn!("Failed to release presence capture: {e:#}");
            }
        }
    }

    /// Release and reopen the device (after resume from sleep)
    pub async fn reacquire(&mut self) {
        self.release().await;
        self.try_acquire().await;
    }

    /// Read the source, reopening the device first if it is not held
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or the read fails
    pub async fn is_present(&mut self) -> Result<bool> {
        if !self.held {
            self.try_acquire().await;
            anyhow::ensure!(self.held, "Presence capture is not available");
        }
        self.source.is_present().await
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let mut source = std::mem::replace(&mut self.source, Box::new(AlwaysPresent));
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = source.release().await {
                        log::warn!("Failed to release presence capture: {e:#}");
                    }
                });
            }
            Err(_) => log::warn!("Presence capture dropped outside a runtime, not released"),
        }
    }
}
