use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{ActiveWindow, SystemMonitor};

// CoreGraphics bindings for idle time detection
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceSecondsSinceLastEventType(
        source_state_id: u32,
        event_type: u32,
    ) -> f64;
}

// CGEventSourceStateID
const K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE: u32 = 0;

// kCGAnyInputEventType
const K_CG_ANY_INPUT_EVENT_TYPE: u32 = u32::MAX;

// Title goes last because it may itself contain the separator
const FRONT_WINDOW_SCRIPT: &str = r#"
    tell application "System Events"
        set frontProc to first application process whose frontmost is true
        set procName to name of frontProc
        try
            set procPath to POSIX path of (file of frontProc as alias)
        on error
            set procPath to ""
        end try
        try
            set winTitle to name of front window of frontProc
        on error
            set winTitle to ""
        end try
        return procName & "|" & procPath & "|" & winTitle
    end tell
"#;

pub struct MacOSMonitor;

impl MacOSMonitor {
    /// Create a new macOS monitor
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns `Result` for consistency with other platforms
    pub fn new() -> Result<Self> {
        Ok(Self)
    }

    /// Time since the last keyboard/mouse/trackpad event
    fn system_idle_seconds() -> f64 {
        unsafe {
            CGEventSourceSecondsSinceLastEventType(
                K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE,
                K_CG_ANY_INPUT_EVENT_TYPE,
            )
        }
    }
}

fn parse_front_window(raw: &str) -> Option<ActiveWindow> {
    let mut parts = raw.trim().splitn(3, '|');
    let process_name = parts.next().filter(|s| !s.is_empty())?.to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let title = parts.next().unwrap_or_default().to_string();
    Some(ActiveWindow {
        title,
        process_name,
        path,
    })
}

#[async_trait]
impl SystemMonitor for MacOSMonitor {
    async fn get_active_window(&self) -> Result<Option<ActiveWindow>> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(FRONT_WINDOW_SCRIPT)
            .output()
            .await
            .context("Failed to run osascript")?;

        if !output.status.success() {
            // Usually a missing Accessibility permission
            log::debug!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(parse_front_window(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn get_idle_seconds(&self) -> Result<u32> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idle_secs = Self::system_idle_seconds() as u32;
        Ok(idle_secs)
    }
}
