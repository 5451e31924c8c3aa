//! Repository traits for the forecasting stores.
//!
//! Each store the engine talks to gets its own focused trait:
//!
//! - [`TimeSeriesRepository`]: live operational snapshots
//! - [`PatternRepository`]: hourly pattern buckets
//! - [`LimitsRepository`]: operational limit bands
//! - [`ForecastRepository`]: forecast runs
//! - [`EventRepository`]: breach events
//!
//! Services that need everything take a [`FullRepository`]:
//!
//! ```ignore
//! async fn refresh<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let latest = repo.latest_snapshot().await?;
//!     let limits = repo.list_limits().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod forecasts;
pub mod limits;
pub mod patterns;
pub mod timeseries;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use events::EventRepository;
pub use forecasts::ForecastRepository;
pub use limits::LimitsRepository;
pub use patterns::PatternRepository;
pub use timeseries::TimeSeriesRepository;

/// Composite bound over every repository trait.
pub trait FullRepository:
    TimeSeriesRepository + PatternRepository + LimitsRepository + ForecastRepository + EventRepository
{
}

impl<T> FullRepository for T where
    T: TimeSeriesRepository
        + PatternRepository
        + LimitsRepository
        + ForecastRepository
        + EventRepository
{
}
