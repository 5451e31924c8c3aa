//! Storage for snapshots, patterns, limits, forecast runs and events.
//!
//! # Layout
//!
//! - `repository`: focused async traits plus the [`FullRepository`] composite
//! - `repositories::local`: in-memory backend (feature `local-repo`)
//! - `repositories::postgres`: Diesel backend (feature `postgres-repo`)
//! - `factory` / `repo_config`: backend selection from TOML or environment
//! - `services`: backend-agnostic operations; prefer these in application code
//!
//! ```ignore
//! use mill_jit::db::{services, RepositoryFactory, RepositoryType};
//!
//! let repo = RepositoryFactory::create(RepositoryType::Local, None).await?;
//! services::ensure_default_limits(repo.as_ref()).await?;
//! let latest = services::latest_forecast_run(repo.as_ref()).await?;
//! ```

// postgres takes precedence when both backends are enabled
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use services::{
    ensure_default_limits, health_check, ingest_snapshot, latest_forecast_run, prune_history,
    store_forecast_run, PruneReport,
};

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, EventRepository, ForecastRepository, FullRepository, LimitsRepository,
    PatternRepository, RepositoryError, RepositoryResult, TimeSeriesRepository,
};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

/// Process-wide repository, set once at startup.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

/// Build the repository described by `config` and install it as the
/// process-wide instance. A second call keeps the first instance.
pub async fn init_repository(config: &RepositoryConfig) -> Result<Arc<dyn FullRepository>> {
    if let Some(existing) = REPOSITORY.get() {
        return Ok(existing.clone());
    }

    let repo = RepositoryFactory::from_repository_config(config)
        .await
        .context("Failed to initialize repository")?;
    let _ = REPOSITORY.set(repo);

    REPOSITORY
        .get()
        .cloned()
        .context("Repository initialization raced and lost")
}

pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    REPOSITORY
        .get()
        .context("Repository not initialized. Call init_repository() first.")
}
