//! Event recorder sink for forecast breaches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::ForecastEvent;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append events; an empty slice is a no-op.
    async fn record_events(&self, events: &[ForecastEvent]) -> RepositoryResult<()>;

    /// Newest events first, by generation timestamp then horizon.
    async fn recent_events(&self, limit: usize) -> RepositoryResult<Vec<ForecastEvent>>;

    /// Delete events of runs generated before `cutoff`, returning how many were removed.
    async fn prune_events_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize>;
}
