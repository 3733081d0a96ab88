//! Trait for the source of live occupancy snapshots.

use anyhow::Result;

use crate::parser::Snapshot;

/// Abstraction over a snapshot provider.
#[async_trait::async_trait]
pub trait TouristApi: Send + Sync {
    /// Returns the latest reading of every site.
    ///
    /// Implementations return an error when the provider reports a failure,
    /// so callers only ever see successful snapshots.
    async fn fetch_snapshot(&self) -> Result<Snapshot>;
}
