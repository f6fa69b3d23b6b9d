use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{ActiveWindow, SystemMonitor};

/// X11 monitor backed by `xdotool` and `xprintidle`
pub struct LinuxMonitor;

impl LinuxMonitor {
    /// Create a new Linux monitor
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns `Result` for consistency with other platforms
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

/// Run a helper; `Ok(None)` when it ran but reported failure
async fn command_output(program: &str, args: &[&str]) -> Result<Option<String>> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to run '{program}' (is it installed?)"))?;

    if !output.status.success() {
        return Ok(None);
    }
    Ok(Some(
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
    ))
}

fn parse_idle_ms(raw: &str) -> Option<u32> {
    let ms: u64 = raw.trim().parse().ok()?;
    u32::try_from(ms / 1000).ok()
}

async fn process_details(pid: u32) -> (String, String) {
    let name = tokio::fs::read_to_string(format!("/proc/{pid}/comm"))
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let path = tokio::fs::read_link(format!("/proc/{pid}/exe"))
        .await
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    (name, path)
}

#[async_trait]
impl SystemMonitor for LinuxMonitor {
    async fn get_active_window(&self) -> Result<Option<ActiveWindow>> {
        let Some(window_id) = command_output("xdotool", &["getactivewindow"]).await? else {
            log::debug!("No focused window");
            return Ok(None);
        };

        let title = command_output("xdotool", &["getwindowname", &window_id])
            .await?
            .unwrap_or_default();

        let pid = command_output("xdotool", &["getwindowpid", &window_id])
            .await?
            .and_then(|s| s.parse::<u32>().ok());

        let (process_name, path) = match pid {
            Some(pid) => process_details(pid).await,
            None => (String::new(), String::new()),
        };

        Ok(Some(ActiveWindow {
            title,
            process_name,
            path,
        }))
    }

    async fn get_idle_seconds(&self) -> Result<u32> {
        let raw = command_output("xprintidle", &[])
            .await?
            .context("xprintidle failed (no X display?)")?;
        parse_idle_ms(&raw).with_context(|| format!("Unexpected xprintidle output '{raw}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_idle_ms() {
        assert_eq!(parse_idle_ms("12345\n"), Some(12));
        assert_eq!(parse_idle_ms("999"), Some(0));
        assert_eq!(parse_idle_ms("not a number"), None);
    }

    #[tokio::test]
    async fn test_process_details_for_self() {
        let (name, path) = process_details(std::process::id()).await;
        assert!(!name.is_empty());
        assert!(!path.is_empty());
    }

    #[tokio::test]
    async fn test_process_details_for_missing_pid() {
        let (name, path) = process_details(u32::MAX).await;
        assert!(name.is_empty());
        assert!(path.is_empty());
    }
}
