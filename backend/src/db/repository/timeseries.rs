//! Append-only store of live operational snapshots.
//!
//! The series belongs to the upstream producer; this crate only appends
//! ingested samples and reads them back, it never deletes any.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::OperationalSnapshot;

/// Time-series operations over [`OperationalSnapshot`] samples.
///
/// Implementations must be `Send + Sync` so a single repository can be shared
/// between the HTTP handlers and the forecast scheduler.
#[async_trait]
pub trait TimeSeriesRepository: Send + Sync {
    /// Check if the backing store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Ok(false)` if it is reachable but degraded
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Append one sample. Samples may arrive out of order.
    async fn append_snapshot(&self, snapshot: &OperationalSnapshot) -> RepositoryResult<()>;

    /// The sample with the greatest timestamp, or `None` when the series is empty.
    async fn latest_snapshot(&self) -> RepositoryResult<Option<OperationalSnapshot>>;

    /// Samples strictly after `since`, ordered by timestamp ascending.
    async fn snapshots_since(
        &self,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<OperationalSnapshot>>;
}
