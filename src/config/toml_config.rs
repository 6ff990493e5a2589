use crate::config::{DashboardConfig, OverlapPolicy};
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub backend: Option<BackendSection>,
    pub polling: Option<PollingSection>,
    pub display: Option<DisplaySection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    pub endpoint: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    pub interval_ms: Option<u64>,
    pub overlap: Option<OverlapPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplaySection {
    pub dimmed_opacity: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Load a config file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse config text, substituting `${VAR}` from the environment first.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    // Unset variables are left as-is so the validator reports them.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DashboardError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    /// Layer this file's values over `base`.
    pub fn apply_to(&self, base: DashboardConfig) -> DashboardConfig {
        let mut config = base;

        if let Some(backend) = &self.backend {
            if let Some(endpoint) = &backend.endpoint {
                config.endpoint = endpoint.clone();
            }
            if let Some(timeout) = backend.request_timeout_ms {
                config.request_timeout_ms = timeout;
            }
        }

        if let Some(polling) = &self.polling {
            if let Some(interval) = polling.interval_ms {
                config.poll_interval_ms = interval;
            }
            if let Some(overlap) = polling.overlap {
                config.overlap = overlap;
            }
        }

        if let Some(opacity) = self.display.as_ref().and_then(|d| d.dimmed_opacity) {
            config.dimmed_opacity = opacity;
        }

        config
    }

    pub fn to_dashboard_config(&self) -> DashboardConfig {
        self.apply_to(DashboardConfig::default())
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_dashboard_config().validate()
    }
}
