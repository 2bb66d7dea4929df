//! Capture settings.
//!
//! Loads settings from config.json at startup. Provides the fuzzy-match
//! threshold, settle delays, activation retry policy and output location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use tracing::{info, warn};

use crate::capture::ActivationTiming;
use crate::window::DEFAULT_FUZZY_THRESHOLD;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<CaptureConfig> = OnceLock::new();

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Minimum fuzzy score (0-100) for a title match
    pub fuzzy_threshold: u8,
    /// Wait after restoring a minimized window (milliseconds)
    pub restore_settle_ms: u64,
    /// Wait after activating the target window (milliseconds)
    pub activation_settle_ms: u64,
    /// Wait after handing focus back to the previous window (milliseconds)
    pub restore_previous_settle_ms: u64,
    /// Activation attempts before the fallback gives up
    pub activation_retries: u32,
    /// Wait between activation attempts (milliseconds)
    pub activation_backoff_ms: u64,
    /// Image scale used for OCR, 1-100
    pub ocr_scale_percent: u8,
    /// Try Windows.Graphics.Capture before PrintWindow
    pub use_graphics_capture: bool,
    /// Maximum wait for a Windows.Graphics.Capture frame (milliseconds)
    pub frame_timeout_ms: u64,
    /// Where saved screenshots go; the downloads folder when unset
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            restore_settle_ms: 300,
            activation_settle_ms: 500,
            restore_previous_settle_ms: 200,
            activation_retries: 3,
            activation_backoff_ms: 250,
            ocr_scale_percent: 100,
            use_graphics_capture: false,
            frame_timeout_ms: 5000,
            screenshot_dir: None,
        }
    }
}

impl CaptureConfig {
    pub fn restore_settle(&self) -> Duration {
        Duration::from_millis(self.restore_settle_ms)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn activation_timing(&self) -> ActivationTiming {
        ActivationTiming {
            retries: self.activation_retries.max(1),
            settle: Duration::from_millis(self.activation_settle_ms),
            restore_settle: Duration::from_millis(self.restore_previous_settle_ms),
            backoff: Duration::from_millis(self.activation_backoff_ms),
        }
    }

    /// Directory for persisted screenshots.
    pub fn screenshot_dir(&self) -> PathBuf {
        self.screenshot_dir
            .clone()
            .unwrap_or_else(crate::paths::get_downloads_dir)
    }
}

/// Loads configuration from `path` or returns defaults.
pub fn load_config_from(path: &Path) -> CaptureConfig {
    info!("Looking for config at: {}", path.display());

    if !path.exists() {
        info!("config.json not found. Using default config.");
        return CaptureConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse config.json: {}. Using defaults.", e);
                CaptureConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config.json: {}. Using defaults.", e);
            CaptureConfig::default()
        }
    }
}

/// Initializes the global configuration from the config.json next to the
/// executable. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config_from(&crate::paths::get_config_path()));
}

/// Returns the global configuration, or defaults if `init_config` was never
/// called.
pub fn get_config() -> &'static CaptureConfig {
    CONFIG.get_or_init(CaptureConfig::default)
}
