use crate::domain::model::{ConnectionState, DisplayTarget, FetchOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Where counter snapshots come from.
#[async_trait]
pub trait CountSource: Send + Sync + 'static {
    async fn fetch_counts(&self) -> FetchOutcome;
}

/// Render sink for the three counters and the connectivity state.
pub trait CountDisplay: Send + Sync + 'static {
    /// Resolves once the surface can accept writes.
    fn ready(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn write_count(&self, target: DisplayTarget, value: u64);

    fn set_connection(&self, state: ConnectionState);
}
