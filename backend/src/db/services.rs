//! Backend-agnostic store operations.
//!
//! These functions hold the rules that must hold regardless of the storage
//! backend: ingest validation, forecast-run invariants, limit seeding and
//! retention.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  HTTP handlers / forecast scheduler          │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │  db::services (this module)                  │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │  Repository traits (repository/)             │
//! └──────────┬───────────────────────┬───────────┘
//!            │                       │
//!   ┌────────▼────────┐    ┌─────────▼─────────┐
//!   │ LocalRepository │    │ PostgresRepository│
//!   └─────────────────┘    └───────────────────┘
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::models::{ForecastRun, OperationalLimit, OperationalSnapshot};

pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

/// Validate and append one sample from the data producer.
pub async fn ingest_snapshot<R: FullRepository + ?Sized>(
    repo: &R,
    snapshot: &OperationalSnapshot,
) -> RepositoryResult<()> {
    snapshot.validate().map_err(|e| {
        RepositoryError::validation_with_context(
            e,
            ErrorContext::new("ingest_snapshot")
                .with_entity("snapshot")
                .with_entity_id(snapshot.timestamp),
        )
    })?;
    repo.append_snapshot(snapshot).await?;
    debug!(
        "Ingested snapshot at {} (stock {:.0} t)",
        snapshot.timestamp,
        snapshot.yard_stock.value()
    );
    Ok(())
}

/// Persist a forecast run after checking its structural invariants.
///
/// An invalid run is rejected before anything reaches the store.
pub async fn store_forecast_run<R: FullRepository + ?Sized>(
    repo: &R,
    run: &ForecastRun,
) -> RepositoryResult<()> {
    run.validate().map_err(|e| {
        RepositoryError::validation_with_context(
            e,
            ErrorContext::new("store_forecast_run")
                .with_entity("forecast_run")
                .with_entity_id(run.generated_at),
        )
    })?;
    repo.store_forecast_run(run).await?;
    info!(
        "Stored forecast run {} ({} horizons, {} breaches)",
        run.generated_at,
        run.points.len(),
        run.breaches().count()
    );
    Ok(())
}

pub async fn latest_forecast_run<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Option<ForecastRun>> {
    repo.latest_forecast_run().await
}

/// Seed any missing well-known limit rows. Existing rows are left untouched.
///
/// Returns the number of rows inserted.
pub async fn ensure_default_limits<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<usize> {
    let mut inserted = 0;
    for limit in OperationalLimit::defaults() {
        if repo.limits_for(&limit.variable).await?.is_none() {
            repo.upsert_limit(&limit).await?;
            inserted += 1;
        }
    }
    if inserted > 0 {
        info!("Seeded {} default operational limits", inserted);
    }
    Ok(inserted)
}

/// Outcome of a retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub forecast_runs: usize,
    pub events: usize,
}

/// Drop forecast runs, and the breach events recorded for them, generated
/// before `cutoff`. Snapshots are never pruned here.
///
/// A failure on one store does not stop the other from being pruned; the
/// first error is returned after both have been attempted.
pub async fn prune_history<R: FullRepository + ?Sized>(
    repo: &R,
    cutoff: DateTime<Utc>,
) -> RepositoryResult<PruneReport> {
    let runs = repo.prune_forecast_runs_before(cutoff).await;
    let events = repo.prune_events_before(cutoff).await;

    match (runs, events) {
        (Ok(forecast_runs), Ok(events)) => {
            if forecast_runs + events > 0 {
                info!(
                    "Pruned {} forecast runs and {} breach events older than {}",
                    forecast_runs, events, cutoff
                );
            }
            Ok(PruneReport {
                forecast_runs,
                events,
            })
        }
        (Err(e), other) | (other, Err(e)) => {
            if let Err(second) = other {
                warn!("Retention pass also failed on second store: {}", second);
            }
            Err(e.with_operation("prune_history"))
        }
    }
}
