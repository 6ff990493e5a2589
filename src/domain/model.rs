use crate::utils::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counter payload returned by the backend. Every field is optional so a
/// partial payload still updates whatever it carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSnapshot {
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub count_in: Option<u64>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub count_out: Option<u64>,
    /// Backend-computed occupancy. Signed so an unfloored value still parses;
    /// ignored for display in favor of [`CountSnapshot::present`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<i64>,
}

impl CountSnapshot {
    pub fn new(count_in: u64, count_out: u64) -> Self {
        Self {
            count_in: Some(count_in),
            count_out: Some(count_out),
            present: None,
        }
    }

    /// `max(0, in - out)`, only when both counters are known.
    pub fn present(&self) -> Option<u64> {
        match (self.count_in, self.count_out) {
            (Some(count_in), Some(count_out)) => Some(present_count(count_in, count_out)),
            _ => None,
        }
    }
}

pub fn present_count(count_in: u64, count_out: u64) -> u64 {
    count_in.saturating_sub(count_out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayTarget {
    InCount,
    OutCount,
    PresentCount,
}

impl DisplayTarget {
    pub const ALL: [DisplayTarget; 3] = [
        DisplayTarget::InCount,
        DisplayTarget::OutCount,
        DisplayTarget::PresentCount,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            DisplayTarget::InCount => "in-count",
            DisplayTarget::OutCount => "out-count",
            DisplayTarget::PresentCount => "present-count",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayTarget::InCount => "IN",
            DisplayTarget::OutCount => "OUT",
            DisplayTarget::PresentCount => "PRESENT",
        }
    }
}

impl fmt::Display for DisplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Connected,
    Disconnected { opacity: f32 },
}

impl ConnectionState {
    pub const DEFAULT_DIMMED_OPACITY: f32 = 0.6;

    pub fn disconnected() -> Self {
        ConnectionState::Disconnected {
            opacity: Self::DEFAULT_DIMMED_OPACITY,
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            ConnectionState::Connected => 1.0,
            ConnectionState::Disconnected { opacity } => *opacity,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Result of one fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Updated(CountSnapshot),
    TimedOut,
    Failed(DashboardError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Updated(_))
    }

    pub fn snapshot(&self) -> Option<&CountSnapshot> {
        match self {
            FetchOutcome::Updated(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    #[serde(default)]
    pub video_active: bool,
}
