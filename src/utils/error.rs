use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("HTTP {status}")]
    Http { status: reqwest::StatusCode },

    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid JSON from backend: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Poller is already running")]
    AlreadyRunning,
}

impl DashboardError {
    /// True for every flavor of deadline expiry, including reqwest's own.
    pub fn is_timeout(&self) -> bool {
        match self {
            DashboardError::Timeout(_) => true,
            DashboardError::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DashboardError::ConfigError { .. }
                | DashboardError::InvalidConfigValueError { .. }
                | DashboardError::TomlError(_)
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DashboardError::Http { status } if status.is_server_error() => {
                "The backend reported an internal error; check its logs"
            }
            DashboardError::Http { .. } => "Check that the endpoint path is correct",
            DashboardError::Transport(_) | DashboardError::Timeout(_) => {
                "Make sure the backend is running and reachable"
            }
            DashboardError::Parse(_) => "The endpoint did not return the expected JSON payload",
            DashboardError::IoError(_) => "Check that the file exists and is readable",
            DashboardError::TomlError(_) => "Fix the syntax of the configuration file",
            DashboardError::ConfigError { .. } | DashboardError::InvalidConfigValueError { .. } => {
                "Fix the configuration value and try again"
            }
            DashboardError::AlreadyRunning => "Stop the poller before starting it again",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
