pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command};
pub use config::{toml_config::TomlConfig, DashboardConfig, OverlapPolicy};

pub use adapters::display::{DisplayState, MemoryDisplay, TerminalDisplay};
pub use crate::core::{
    client::HttpCountsClient,
    dashboard::update_counts,
    poller::{DashboardPoller, PollStats},
};
pub use domain::model::{
    BackendStatus, ConnectionState, CountSnapshot, DisplayTarget, FetchOutcome, Visibility,
};
pub use domain::ports::{CountDisplay, CountSource};
pub use utils::error::{DashboardError, Result};
