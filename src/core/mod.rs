pub mod client;
pub mod dashboard;
pub mod poller;

pub use crate::domain::model::{
    ConnectionState, CountSnapshot, DisplayTarget, FetchOutcome, Visibility,
};
pub use crate::domain::ports::{CountDisplay, CountSource};
pub use crate::utils::error::Result;
