use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PAGE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeouts: TimeoutConfig,
    pub validation: ValidationConfig,
    pub screenshots: ScreenshotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub page_timeout_ms: u64,
    pub element_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub fail_fast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    pub enabled: bool,
    pub on_test_error: bool,
    pub dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            validation: ValidationConfig::default(),
            screenshots: ScreenshotConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_timeout_ms: DEFAULT_PAGE_TIMEOUT_MS,
            element_timeout_ms: DEFAULT_ELEMENT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_test_error: true,
            dir: PathBuf::from("./screenshots"),
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.page_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.element_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_interval_ms)
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.page_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.element_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.timeouts.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.validation.fail_fast = fail_fast;
        self
    }

    pub fn with_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots.enabled = enabled;
        self
    }

    pub fn with_test_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots.on_test_error = enabled;
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots.dir = dir.into();
        self
    }

    /// Restore the page and element timeouts to their defaults.
    pub fn reset_timeouts(&mut self) {
        self.timeouts.page_timeout_ms = DEFAULT_PAGE_TIMEOUT_MS;
        self.timeouts.element_timeout_ms = DEFAULT_ELEMENT_TIMEOUT_MS;
    }
}
