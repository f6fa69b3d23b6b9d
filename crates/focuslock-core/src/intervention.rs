use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::command::{run_checked, COMMAND_TIMEOUT};
use crate::config::OverlayConfig;
use crate::session_clock::Intervention;

pub const NOTIFICATION_TITLE: &str = "FocusLock";

/// How long a show command may take to fail before it counts as running
const OVERLAY_START_GRACE: Duration = Duration::from_millis(500);

/// Presentation layer receiving lock/unlock/notify requests
#[async_trait]
pub trait InterventionSink: Send + Sync {
    /// Carry out one intervention without blocking on the user.
    ///
    /// Repeated `LockOverlay`/`UnlockOverlay` must be no-ops.
    async fn dispatch(&self, intervention: &Intervention) -> Result<()>;
}

/// Desktop notifications plus an overlay driven by external commands.
///
/// The show command may stay up for as long as the overlay is visible (a
/// screen locker, say). It is kept as a child process and killed on unlock.
pub struct DesktopSink {
    overlay: OverlayConfig,
    overlay_shown: AtomicBool,
    overlay_child: Mutex<Option<Child>>,
}

impl DesktopSink {
    #[must_use]
    pub fn new(overlay: OverlayConfig) -> Self {
        Self {
            overlay,
            overlay_shown: AtomicBool::new(false),
            overlay_child: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn overlay_shown(&self) -> bool {
        self.overlay_shown.load(Ordering::SeqCst)
    }

    async fn set_overlay(&self, shown: bool) -> Result<()> {
        if self.overlay_shown.swap(shown, Ordering::SeqCst) == shown {
            log::debug!("Overlay already {}", if shown { "shown" } else { "hidden" });
            return Ok(());
        }

        let result = if shown {
            self.show_overlay().await
        } else {
            self.hide_overlay().await
        };
        if result.is_err() {
            // Not in the requested state; allow the next request to retry
            self.overlay_shown.store(!shown, Ordering::SeqCst);
        }
        result
    }

    async fn show_overlay(&self) -> Result<()> {
        let Some(argv) = &self.overlay.show_command else {
            log::info!("Overlay engaged (no overlay command configured)");
            return Ok(());
        };
        let (program, args) = argv.split_first().context("Command is empty")?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run '{program}'"))?;

        match tokio::time::timeout(OVERLAY_START_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status.with_context(|| format!("Failed to wait for '{program}'"))?;
                anyhow::ensure!(status.success(), "'{program}' exited with {status}");
            }
            Err(_) => {
                log::debug!("Overlay command '{program}' is running");
                *self.overlay_child.lock().await = Some(child);
            }
        }
        Ok(())
    }

    async fn hide_overlay(&self) -> Result<()> {
        if let Some(mut child) = self.overlay_child.lock().await.take() {
            if child.try_wait()?.is_none() {
                tokio::time::timeout(COMMAND_TIMEOUT, child.kill())
                    .await
                    .context("Overlay command did not exit after kill")??;
            }
        }

        match &self.overlay.hide_command {
            Some(argv) => run_checked(argv, COMMAND_TIMEOUT).await,
            None => {
                log::info!("Overlay released");
                Ok(())
            }
        }
    }
}

/// Escape a string for an AppleScript string literal
#[cfg(any(target_os = "macos", test))]
fn applescript_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(target_os = "macos")]
async fn notify_desktop(message: &str) -> Result<()> {
    let script = format!(
        "display notification {} with title {}",
        applescript_quote(message),
        applescript_quote(NOTIFICATION_TITLE)
    );
    run_checked(&["osascript".to_string(), "-e".to_string(), script], COMMAND_TIMEOUT).await
}

#[cfg(target_os = "linux")]
async fn notify_desktop(message: &str) -> Result<()> {
    run_checked(
        &[
            "notify-send".to_string(),
            "--app-name=focuslock".to_string(),
            NOTIFICATION_TITLE.to_string(),
            message.to_string(),
        ],
        COMMAND_TIMEOUT,
    )
    .await
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
async fn notify_desktop(message: &str) -> Result<()> {
    log::info!("{NOTIFICATION_TITLE}: {message}");
    Ok(())
}

#[async_trait]
impl InterventionSink for DesktopSink {
    async fn dispatch(&self, intervention: &Intervention) -> Result<()> {
        match intervention {
            Intervention::LockOverlay => self.set_overlay(true).await,
            Intervention::UnlockOverlay => self.set_overlay(false).await,
            Intervention::Notify(message) => notify_desktop(message)
                .await
                .context("Failed to show desktop notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applescript_quote_escapes() {
        assert_eq!(applescript_quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(applescript_quote(r"a\b"), r#""a\\b""#);
    }

    #[tokio::test]
    async fn test_overlay_requests_are_idempotent() {
        let sink = DesktopSink::new(OverlayConfig::default());
        sink.dispatch(&Intervention::LockOverlay).await.unwrap();
        sink.dispatch(&Intervention::LockOverlay).await.unwrap();
        assert!(sink.overlay_shown());

        sink.dispatch(&Intervention::UnlockOverlay).await.unwrap();
        sink.dispatch(&Intervention::UnlockOverlay).await.unwrap();
        assert!(!sink.overlay_shown());
    }

    #[tokio::test]
    async fn test_overlay_command_runs_once_per_transition() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("shown");
        let sink = DesktopSink::new(OverlayConfig {
            show_command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("echo x >> {}", marker.display()),
            ]),
            hide_command: None,
        });

        sink.dispatch(&Intervention::LockOverlay).await.unwrap();
        sink.dispatch(&Intervention::LockOverlay).await.unwrap();
        let written = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(written.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_overlay_command_can_retry() {
        let sink = DesktopSink::new(OverlayConfig {
            show_command: Some(vec!["false".to_string()]),
            hide_command: None,
        });
        assert!(sink.dispatch(&Intervention::LockOverlay).await.is_err());
        assert!(!sink.overlay_shown());
        assert!(sink.dispatch(&Intervention::LockOverlay).await.is_err());
    }

    #[tokio::test]
    async fn test_long_running_overlay_does_not_block() {
        let sink = DesktopSink::new(OverlayConfig {
            show_command: Some(vec!["sleep".to_string(), "30".to_string()]),
            hide_command: None,
        });

        let lock = tokio::time::timeout(
            Duration::from_secs(3),
            sink.dispatch(&Intervention::LockOverlay),
        )
        .await;
        assert!(lock.expect("lock must not wait for the overlay").is_ok());
        assert!(sink.overlay_shown());
        assert!(sink.overlay_child.lock().await.is_some());

        let unlock = tokio::time::timeout(
            Duration::from_secs(3),
            sink.dispatch(&Intervention::UnlockOverlay),
        )
        .await;
        assert!(unlock.expect("unlock must kill the overlay").is_ok());
        assert!(!sink.overlay_shown());
        assert!(sink.overlay_child.lock().await.is_none());
    }
}
