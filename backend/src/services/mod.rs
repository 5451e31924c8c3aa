//! Forecast orchestration on top of the repository layer.
//!
//! Services read state through [`crate::db::FullRepository`], hand resolved
//! inputs to the pure functions in [`crate::algorithms`] and persist what
//! comes back.

pub mod clock;
pub mod error;
pub mod forecast;
pub mod operations;
pub mod pattern_resolver;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ForecastError, ForecastWarning, PersistenceError, PersistenceStage};
pub use forecast::{ForecastConfig, ForecastEngine, ForecastOutcome, Projection};
pub use operations::{operational_summary, OperationalSummary};
pub use pattern_resolver::{PatternResolver, PatternTier, ResolverSettings};
pub use scheduler::{ForecastScheduler, SchedulerSettings, TickOutcome};

use std::future::Future;
use std::time::Duration;

use crate::db::{RepositoryError, RepositoryResult};

/// Await a store call for at most `limit`; elapsing maps to a retryable
/// [`RepositoryError::TimeoutError`].
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::timed_out(operation, limit)),
    }
}
