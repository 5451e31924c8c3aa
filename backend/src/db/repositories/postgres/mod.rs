//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//! - Forecast runs written in a single transaction
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::task;

use crate::db::repository::{
    ErrorContext, EventRepository, ForecastRepository, LimitsRepository, PatternRepository,
    RepositoryError, RepositoryResult, TimeSeriesRepository,
};
use crate::models::{
    ForecastEvent, ForecastRun, HourlyPattern, OperationalLimit, OperationalSnapshot,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    pub max_retries: u32,
    /// Initial retry delay; doubles on each attempt
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Read the configuration from the `DATABASE_URL` / `PG_*` variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Build the pool and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Migration failed: {}", e),
                    ErrorContext::new("run_migrations"),
                )
            })?;
        }

        log::info!(
            "Postgres repository ready (pool max={}, retries={})",
            config.max_pool_size,
            config.max_retries
        );

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new(operation)
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        log::debug!("{} failed on attempt {}: {}", operation, attempt + 1, e);
                        last_error = Some(e);
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e.with_operation(operation));
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new(operation),
            )
        })?
    }

    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }
}

fn load_run(conn: &mut PgConnection, generated_at: DateTime<Utc>) -> RepositoryResult<Option<ForecastRun>> {
    let rows: Vec<ForecastPointRow> = forecast_points::table
        .filter(forecast_points::generated_at.eq(generated_at))
        .order(forecast_points::horizon.asc())
        .select(ForecastPointRow::as_select())
        .load(conn)?;

    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let model_version = first.model_version.clone();
    let points = rows
        .into_iter()
        .map(ForecastPointRow::into_point)
        .collect::<RepositoryResult<Vec<_>>>()?;

    Ok(Some(ForecastRun {
        generated_at,
        model_version,
        points,
    }))
}

#[async_trait]
impl TimeSeriesRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn append_snapshot(&self, snapshot: &OperationalSnapshot) -> RepositoryResult<()> {
        let row = NewSnapshotRow::from(snapshot);
        self.with_conn("append_snapshot", move |conn| {
            diesel::insert_into(operational_snapshots::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn latest_snapshot(&self) -> RepositoryResult<Option<OperationalSnapshot>> {
        self.with_conn("latest_snapshot", |conn| {
            let row = operational_snapshots::table
                .order((
                    operational_snapshots::recorded_at.desc(),
                    operational_snapshots::snapshot_id.desc(),
                ))
                .select(SnapshotRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(OperationalSnapshot::from))
        })
        .await
    }

    async fn snapshots_since(
        &self,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<OperationalSnapshot>> {
        self.with_conn("snapshots_since", move |conn| {
            let rows = operational_snapshots::table
                .filter(operational_snapshots::recorded_at.gt(since))
                .order(operational_snapshots::recorded_at.asc())
                .select(SnapshotRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(OperationalSnapshot::from).collect())
        })
        .await
    }
}

#[async_trait]
impl PatternRepository for PostgresRepository {
    async fn pattern_for(
        &self,
        hour_of_day: u8,
        weekday: u8,
    ) -> RepositoryResult<Option<HourlyPattern>> {
        self.with_conn("pattern_for", move |conn| {
            let row = hourly_patterns::table
                .find((hour_of_day as i16, weekday as i16))
                .select(PatternRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(HourlyPattern::from))
        })
        .await
    }

    async fn upsert_pattern(&self, pattern: &HourlyPattern) -> RepositoryResult<()> {
        pattern.validate().map_err(|e| {
            RepositoryError::validation_with_context(
                e,
                ErrorContext::new("upsert_pattern").with_entity("hourly_pattern"),
            )
        })?;
        let row = PatternRow::from_pattern(pattern, Utc::now());
        self.with_conn("upsert_pattern", move |conn| {
            diesel::insert_into(hourly_patterns::table)
                .values(&row)
                .on_conflict((hourly_patterns::hour_of_day, hourly_patterns::weekday))
                .do_update()
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_patterns(&self) -> RepositoryResult<Vec<HourlyPattern>> {
        self.with_conn("list_patterns", |conn| {
            let rows = hourly_patterns::table
                .order((hourly_patterns::weekday.asc(), hourly_patterns::hour_of_day.asc()))
                .select(PatternRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(HourlyPattern::from).collect())
        })
        .await
    }
}

#[async_trait]
impl LimitsRepository for PostgresRepository {
    async fn limits_for(&self, variable: &str) -> RepositoryResult<Option<OperationalLimit>> {
        let variable = variable.to_string();
        self.with_conn("limits_for", move |conn| {
            let row = operational_limits::table
                .find(variable)
                .select(LimitRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(OperationalLimit::from))
        })
        .await
    }

    async fn upsert_limit(&self, limit: &OperationalLimit) -> RepositoryResult<()> {
        limit.validate().map_err(|e| {
            RepositoryError::validation_with_context(
                e,
                ErrorContext::new("upsert_limit")
                    .with_entity("operational_limit")
                    .with_entity_id(&limit.variable),
            )
        })?;
        let row = LimitRow::from(limit);
        self.with_conn("upsert_limit", move |conn| {
            diesel::insert_into(operational_limits::table)
                .values(&row)
                .on_conflict(operational_limits::variable)
                .do_update()
                .set((
                    operational_limits::lower_bound.eq(excluded(operational_limits::lower_bound)),
                    operational_limits::upper_bound.eq(excluded(operational_limits::upper_bound)),
                    operational_limits::critical_lower
                        .eq(excluded(operational_limits::critical_lower)),
                    operational_limits::critical_upper
                        .eq(excluded(operational_limits::critical_upper)),
                    operational_limits::unit.eq(excluded(operational_limits::unit)),
                    operational_limits::description.eq(excluded(operational_limits::description)),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_limits(&self) -> RepositoryResult<Vec<OperationalLimit>> {
        self.with_conn("list_limits", |conn| {
            let rows = operational_limits::table
                .order(operational_limits::variable.asc())
                .select(LimitRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(OperationalLimit::from).collect())
        })
        .await
    }
}

#[async_trait]
impl ForecastRepository for PostgresRepository {
    async fn store_forecast_run(&self, run: &ForecastRun) -> RepositoryResult<()> {
        let generated_at = run.generated_at;
        let rows: Vec<ForecastPointRow> = run
            .points
            .iter()
            .map(|p| ForecastPointRow::new(generated_at, &run.model_version, p))
            .collect();

        // the (generated_at, horizon) key rejects a second run with the same
        // timestamp as a unique violation, surfaced as a conflict
        self.with_conn("store_forecast_run", move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|tx| {
                diesel::insert_into(forecast_points::table)
                    .values(&rows)
                    .execute(tx)?;
                Ok(())
            })
            .map_err(|e| {
                RepositoryError::from(e).with_entity(format!("forecast_run@{}", generated_at))
            })
        })
        .await
    }

    async fn latest_forecast_run(&self) -> RepositoryResult<Option<ForecastRun>> {
        self.with_conn("latest_forecast_run", |conn| {
            let latest: Option<DateTime<Utc>> = forecast_points::table
                .select(diesel::dsl::max(forecast_points::generated_at))
                .first(conn)?;
            match latest {
                Some(generated_at) => load_run(conn, generated_at),
                None => Ok(None),
            }
        })
        .await
    }

    async fn forecast_run_at(
        &self,
        generated_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<ForecastRun>> {
        self.with_conn("forecast_run_at", move |conn| load_run(conn, generated_at))
            .await
    }

    async fn list_forecast_generations(
        &self,
        limit: usize,
    ) -> RepositoryResult<Vec<DateTime<Utc>>> {
        self.with_conn("list_forecast_generations", move |conn| {
            let generations = forecast_points::table
                .select(forecast_points::generated_at)
                .distinct()
                .order(forecast_points::generated_at.desc())
                .limit(limit as i64)
                .load::<DateTime<Utc>>(conn)?;
            Ok(generations)
        })
        .await
    }

    async fn prune_forecast_runs_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
        self.with_conn("prune_forecast_runs_before", move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|tx| {
                let runs: Vec<DateTime<Utc>> = forecast_points::table
                    .filter(forecast_points::generated_at.lt(cutoff))
                    .select(forecast_points::generated_at)
                    .distinct()
                    .load(tx)?;
                diesel::delete(
                    forecast_points::table.filter(forecast_points::generated_at.lt(cutoff)),
                )
                .execute(tx)?;
                Ok(runs.len())
            })
            .map_err(RepositoryError::from)
        })
        .await
    }
}

#[async_trait]
impl EventRepository for PostgresRepository {
    async fn record_events(&self, events: &[ForecastEvent]) -> RepositoryResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewEventRow> = events.iter().map(NewEventRow::from).collect();
        self.with_conn("record_events", move |conn| {
            diesel::insert_into(forecast_events::table)
                .values(&rows)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn recent_events(&self, limit: usize) -> RepositoryResult<Vec<ForecastEvent>> {
        self.with_conn("recent_events", move |conn| {
            let rows = forecast_events::table
                .order((
                    forecast_events::generated_at.desc(),
                    forecast_events::horizon.asc(),
                ))
                .limit(limit as i64)
                .select(EventRow::as_select())
                .load(conn)?;
            rows.into_iter().map(ForecastEvent::try_from).collect()
        })
        .await
    }

    async fn prune_events_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
        self.with_conn("prune_events_before", move |conn| {
            let removed = diesel::delete(
                forecast_events::table.filter(forecast_events::generated_at.lt(cutoff)),
            )
            .execute(conn)?;
            Ok(removed)
        })
        .await
    }
}
