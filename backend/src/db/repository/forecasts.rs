//! Forecast run persistence.
//!
//! A run is stored as one row per horizon sharing a generation timestamp. The
//! whole run is written in one unit: after a failed store, readers see either
//! the previous state or nothing new, never a partial run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::ForecastRun;

#[async_trait]
pub trait ForecastRepository: Send + Sync {
    /// Persist a complete run, all-or-nothing.
    ///
    /// A run is immutable once stored: a second run with the same generation
    /// timestamp is rejected with [`RepositoryError::Conflict`] and the
    /// committed one is left untouched.
    ///
    /// [`RepositoryError::Conflict`]: super::error::RepositoryError::Conflict
    async fn store_forecast_run(&self, run: &ForecastRun) -> RepositoryResult<()>;

    /// The run with the greatest generation timestamp, points ordered by horizon.
    async fn latest_forecast_run(&self) -> RepositoryResult<Option<ForecastRun>>;

    /// The run generated at exactly `generated_at`.
    async fn forecast_run_at(
        &self,
        generated_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<ForecastRun>>;

    /// Most recent generation timestamps, newest first.
    async fn list_forecast_generations(&self, limit: usize)
        -> RepositoryResult<Vec<DateTime<Utc>>>;

    /// Delete runs generated before `cutoff`, returning how many runs were removed.
    async fn prune_forecast_runs_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize>;
}
