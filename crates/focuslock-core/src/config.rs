use anyhow::{Context, Result};
use focuslock_ml::rules::{
    DEFAULT_EDUCATIONAL_KEYWORDS, DEFAULT_MEDIA_MARKERS, DEFAULT_VIDEO_MARKERS,
};
use focuslock_ml::{Rule, RuleEngine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session_clock::Thresholds;

/// Upper bound on a predictor call so it always fits inside a poll cadence
pub const MAX_PREDICTOR_TIMEOUT_MS: u64 = 2000;

/// Get the local data directory for focuslock.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("focuslock");
    Ok(path)
}

/// Default location of `config.toml`.
///
/// # Errors
///
/// Returns an error if the config directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Failed to get config dir"))?;
    path.push("focuslock");
    path.push("config.toml");
    Ok(path)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub predictor: PredictorConfig,
    pub schedule: ScheduleConfig,
    pub thresholds: Thresholds,
    pub overrides: OverrideConfig,
    pub presence: PresenceConfig,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// When false the gateway never calls the service and fails open
    pub enabled: bool,
    pub url: String,
    pub timeout_ms: u64,
    pub cache_size: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: focuslock_ml::providers::http::DEFAULT_PREDICTOR_URL.to_string(),
            timeout_ms: 1500,
            cache_size: 256,
        }
    }
}

impl PredictorConfig {
    /// Request timeout, clamped to `MAX_PREDICTOR_TIMEOUT_MS`
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.clamp(1, MAX_PREDICTOR_TIMEOUT_MS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub window_poll_secs: u64,
    pub idle_poll_secs: u64,
    pub presence_poll_ms: u64,
    /// Idle time after which accrual pauses
    pub idle_threshold_secs: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            window_poll_secs: 2,
            idle_poll_secs: 5,
            presence_poll_ms: 500,
            idle_threshold_secs: 300,
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub fn window_poll(&self) -> Duration {
        Duration::from_secs(self.window_poll_secs)
    }

    #[must_use]
    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs(self.idle_poll_secs)
    }

    #[must_use]
    pub fn presence_poll(&self) -> Duration {
        Duration::from_millis(self.presence_poll_ms)
    }

    /// Upper bound for one presence probe, kept under the poll period
    #[must_use]
    pub fn presence_timeout(&self) -> Duration {
        Duration::from_millis((self.presence_poll_ms * 4 / 5).max(1))
    }

    /// Seconds credited to the session clock per window tick
    #[must_use]
    pub fn tick_seconds(&self) -> u32 {
        u32::try_from(self.window_poll_secs).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    pub media_markers: Vec<String>,
    pub video_markers: Vec<String>,
    pub educational_keywords: Vec<String>,
    pub rules: Vec<Rule>,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            media_markers: owned(DEFAULT_MEDIA_MARKERS),
            video_markers: owned(DEFAULT_VIDEO_MARKERS),
            educational_keywords: owned(DEFAULT_EDUCATIONAL_KEYWORDS),
            rules: Vec::new(),
        }
    }
}

impl OverrideConfig {
    /// Build the override rule engine
    ///
    /// # Errors
    ///
    /// Returns an error if a user rule has an invalid regex pattern
    pub fn build_engine(&self) -> Result<RuleEngine> {
        let mut engine = RuleEngine::new(
            &self.media_markers,
            &self.video_markers,
            &self.educational_keywords,
        );
        for rule in &self.rules {
            engine
                .add_rule(rule.clone())
                .with_context(|| format!("Invalid override rule pattern '{}'", rule.pattern))?;
        }
        Ok(engine)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Probe run on every presence poll; exit status 0 means a face is visible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_command: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or fails validation
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values the scheduler and session clock rely on
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        let s = &self.schedule;
        anyhow::ensure!(s.window_poll_secs > 0, "schedule.window_poll_secs must be > 0");
        anyhow::ensure!(s.idle_poll_secs > 0, "schedule.idle_poll_secs must be > 0");
        anyhow::ensure!(s.presence_poll_ms > 0, "schedule.presence_poll_ms must be > 0");

        let t = &self.thresholds;
        anyhow::ensure!(t.window_secs > 0, "thresholds.window_secs must be > 0");
        anyhow::ensure!(
            t.distraction_lock_secs <= t.window_secs,
            "thresholds.distraction_lock_secs must not exceed thresholds.window_secs"
        );
        anyhow::ensure!(
            t.productive_break_secs <= t.window_secs,
            "thresholds.productive_break_secs must not exceed thresholds.window_secs"
        );

        for (name, argv) in [
            ("presence.command", &self.presence.command),
            ("presence.acquire_command", &self.presence.acquire_command),
            ("presence.release_command", &self.presence.release_command),
            ("overlay.show_command", &self.overlay.show_command),
            ("overlay.hide_command", &self.overlay.hide_command),
        ] {
            if let Some(argv) = argv {
                anyhow::ensure!(!argv.is_empty(), "{name} must not be an empty list");
            }
        }
        Ok(())
    }
}
