#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/counts";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_DIMMED_OPACITY: f32 = 0.6;

/// What to do when a tick fires while the previous fetch is still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Drop the tick.
    #[default]
    Skip,
    /// Abort the pending fetch and start a new one.
    Supersede,
    /// Let fetches overlap; whichever resolves last wins the display.
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoint: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub dimmed_opacity: f32,
    pub overlap: OverlapPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            dimmed_opacity: DEFAULT_DIMMED_OPACITY,
            overlap: OverlapPolicy::default(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Validate for DashboardConfig {
    fn validate(&self) -> Result<()> {
        validate_url("endpoint", &self.endpoint)?;
        validate_range("poll_interval_ms", self.poll_interval_ms, 10, 60_000)?;
        validate_range("request_timeout_ms", self.request_timeout_ms, 100, 60_000)?;
        validate_range("dimmed_opacity", self.dimmed_opacity, 0.0, 1.0)?;
        Ok(())
    }
}
