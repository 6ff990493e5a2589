use crate::config::toml_config::TomlConfig;
use crate::config::{DashboardConfig, OverlapPolicy};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "occupancy-dashboard")]
#[command(about = "Live IN / OUT / PRESENT counters from a people-counting backend")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Counts endpoint, e.g. http://localhost:8000/api/counts
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Polling period in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Per-request deadline in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Behavior when a tick fires while a fetch is still pending
    #[arg(long, value_enum, global = true)]
    pub overlap: Option<OverlapPolicy>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Poll continuously and render the counters (default)
    Watch,
    /// Fetch the counters once and print them
    Once,
    /// Reset the backend counters to zero
    Reset,
    /// Show backend health
    Status,
}

impl CliConfig {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Watch)
    }

    fn file_config(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path),
            None => Ok(TomlConfig::default()),
        }
    }

    /// Defaults, then the config file, then flags.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let file = self.file_config()?;
        let mut dashboard = file.to_dashboard_config();

        if let Some(endpoint) = &self.endpoint {
            dashboard.endpoint = endpoint.clone();
        }
        if let Some(interval) = self.interval_ms {
            dashboard.poll_interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_ms {
            dashboard.request_timeout_ms = timeout;
        }
        if let Some(overlap) = self.overlap {
            dashboard.overlap = overlap;
        }

        Ok(ResolvedConfig {
            dashboard,
            verbose: self.verbose || file.verbose(),
            json_logs: self.json_logs || file.json_logs(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub dashboard: DashboardConfig,
    pub verbose: bool,
    pub json_logs: bool,
}
