//! Forecast engine: resolves inputs from the stores, projects the yard stock
//! and persists the resulting run.
//!
//! An invocation performs a handful of reads, computes the whole run in
//! memory and issues one bulk write. Every store call is bounded by
//! [`ForecastConfig::store_timeout_ms`]. The only hard failure is an empty
//! time series ([`ForecastError::NoData`]); everything else degrades through
//! fallbacks and is reported as a [`ForecastWarning`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::bounded;
use super::clock::Clock;
use super::error::{ForecastError, ForecastWarning, PersistenceError, PersistenceStage};
use super::pattern_resolver::{PatternResolver, ResolverSettings};
use crate::algorithms::{
    classify, endpoint_trend, project_horizons, Attribution, ConfidenceSchedule, ProjectionInput,
    ProjectionState, RootCauseThresholds, Trend,
};
use crate::config::ConfigError;
use crate::db::{
    self, EventRepository, FullRepository, LimitsRepository, RepositoryResult, TimeSeriesRepository,
};
use crate::models::{
    horizon_instant, mill_offset, ForecastEvent, ForecastPoint, ForecastRun, OperationalLimit,
    OperationalSnapshot, PatternKey, ResolvedPattern, DEFAULT_TRUCK_LOAD_TONS,
    YARD_STOCK_VARIABLE,
};

pub const DEFAULT_HORIZON_HOURS: u32 = 9;
pub const MAX_HORIZON_HOURS: u32 = 24;

/// `[forecast]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Horizons produced by scheduled runs and by requests without `horizon`
    pub default_horizon: u32,
    pub max_horizon: u32,
    pub confidence: ConfidenceSchedule,
    pub thresholds: RootCauseThresholds,
    pub truck_load_tons: f64,
    /// Exact pattern rows with fewer samples are ignored
    pub min_pattern_samples: u32,
    pub trend_window_minutes: i64,
    pub rolling_window_days: i64,
    pub store_timeout_ms: u64,
    /// Fixed offset of the mill's local clock, used for pattern keys
    pub utc_offset_minutes: i32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_horizon: DEFAULT_HORIZON_HOURS,
            max_horizon: MAX_HORIZON_HOURS,
            confidence: ConfidenceSchedule::default(),
            thresholds: RootCauseThresholds::default(),
            truck_load_tons: DEFAULT_TRUCK_LOAD_TONS,
            min_pattern_samples: 1,
            trend_window_minutes: 120,
            rolling_window_days: 7,
            store_timeout_ms: 5_000,
            utc_offset_minutes: 0,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(format!("[forecast] {}", msg)));

        if self.max_horizon == 0 {
            return invalid("max_horizon must be at least 1".to_string());
        }
        if self.default_horizon == 0 || self.default_horizon > self.max_horizon {
            return invalid(format!(
                "default_horizon {} must be in 1..={}",
                self.default_horizon, self.max_horizon
            ));
        }
        if !(self.truck_load_tons.is_finite() && self.truck_load_tons > 0.0) {
            return invalid(format!("truck_load_tons must be positive, got {}", self.truck_load_tons));
        }
        if self.trend_window_minutes <= 0 || self.rolling_window_days <= 0 {
            return invalid("trend and rolling windows must be positive".to_string());
        }
        if self.store_timeout_ms == 0 {
            return invalid("store_timeout_ms must be positive".to_string());
        }
        mill_offset(self.utc_offset_minutes).map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn trend_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.trend_window_minutes)
    }

    pub fn rolling_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.rolling_window_days)
    }
}

/// A computed, not yet persisted, forecast.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    pub anchor: DateTime<Utc>,
    pub current: OperationalSnapshot,
    pub limit: OperationalLimit,
    pub trend: Trend,
    /// Attribution of the live stock, when it is already outside the band
    pub live_assessment: Option<Attribution>,
    pub points: Vec<ForecastPoint>,
    pub warnings: Vec<ForecastWarning>,
}

/// Result of [`ForecastEngine::run_forecast`].
///
/// The run is always complete. `persistence` reports separately whether it
/// (and its breach events) reached the store.
#[derive(Debug)]
pub struct ForecastOutcome {
    pub run: ForecastRun,
    pub current: OperationalSnapshot,
    pub limit: OperationalLimit,
    pub trend: Trend,
    pub live_assessment: Option<Attribution>,
    pub events: Vec<ForecastEvent>,
    pub warnings: Vec<ForecastWarning>,
    pub persistence: Result<(), PersistenceError>,
}

impl ForecastOutcome {
    pub fn is_persisted(&self) -> bool {
        self.persistence.is_ok()
    }
}

#[derive(Clone)]
pub struct ForecastEngine {
    repository: Arc<dyn FullRepository>,
    config: Arc<ForecastConfig>,
    resolver: Arc<ResolverSettings>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ForecastEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ForecastEngine {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        config: ForecastConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let offset: FixedOffset =
            mill_offset(config.utc_offset_minutes).map_err(ConfigError::Invalid)?;
        let resolver = ResolverSettings {
            truck_load_tons: config.truck_load_tons,
            min_pattern_samples: config.min_pattern_samples,
            rolling_window: config.rolling_window(),
            offset,
            store_timeout: config.store_timeout(),
        };
        Ok(Self {
            repository,
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            clock,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repository
    }

    pub fn default_horizon(&self) -> u32 {
        self.config.default_horizon
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The mill's local clock offset.
    pub fn offset(&self) -> FixedOffset {
        self.resolver.offset
    }

    /// Most recent snapshot. An empty time series is [`ForecastError::NoData`].
    pub async fn current_state(&self) -> Result<OperationalSnapshot, ForecastError> {
        self.bounded("latest_snapshot", self.repository.latest_snapshot())
            .await?
            .ok_or(ForecastError::NoData)
    }

    /// Pattern for one bucket through the full fallback chain. Never fails.
    pub async fn historical_pattern(&self, hour_of_day: u8, weekday: u8) -> ResolvedPattern {
        let mut resolver = PatternResolver::new(self.repository.as_ref(), &self.resolver, self.now());
        resolver.resolve(PatternKey::new(hour_of_day, weekday)).await
    }

    /// Endpoint trend over the trailing trend window, flat when the window is sparse.
    pub async fn recent_trend(&self) -> Trend {
        let mut warnings = Vec::new();
        self.trend_at(self.now(), &mut warnings).await
    }

    /// Project `horizon` hours ahead of the clock's current instant without
    /// persisting anything.
    pub async fn project(&self, horizon: u32) -> Result<Projection, ForecastError> {
        self.check_horizon(horizon)?;
        let anchor = self.now();
        let current = self.current_state().await?;

        let mut warnings = Vec::new();
        let limit = self.yard_limit(&mut warnings).await;
        let trend = self.trend_at(anchor, &mut warnings).await;

        let mut resolver = PatternResolver::new(self.repository.as_ref(), &self.resolver, anchor);
        let mut patterns = Vec::with_capacity(horizon as usize);
        for h in 1..=horizon {
            let key = PatternKey::at(horizon_instant(anchor, h), self.resolver.offset);
            patterns.push(resolver.resolve(key).await);
        }
        warnings.extend(resolver.into_warnings());

        let points = project_horizons(&ProjectionInput {
            anchor,
            start: ProjectionState {
                stock: current.yard_stock.value(),
                inflow: current.inflow(),
                outflow: current.outflow(),
            },
            trend,
            patterns: &patterns,
            limit: &limit,
            schedule: &self.config.confidence,
            thresholds: &self.config.thresholds,
        });

        let live_assessment = classify(
            current.yard_stock.value(),
            current.inflow(),
            current.outflow(),
            current.harvest_rate_tph,
            &limit,
            &self.config.thresholds,
        );

        Ok(Projection {
            anchor,
            current,
            limit,
            trend,
            live_assessment,
            points,
            warnings,
        })
    }

    /// Project, then persist the run and its breach events.
    ///
    /// A write failure does not fail the call: the complete run is returned
    /// with the error in [`ForecastOutcome::persistence`]. Events are only
    /// recorded once the run itself is stored.
    pub async fn run_forecast(&self, horizon: u32) -> Result<ForecastOutcome, ForecastError> {
        let projection = self.project(horizon).await?;
        let run = ForecastRun::new(projection.anchor, projection.points);
        let events = Self::breach_events(&run, &projection.limit);

        let persistence = self.persist(&run, &events).await;
        if let Err(e) = &persistence {
            log::error!(
                "Forecast run {} computed but not persisted: {}",
                run.generated_at,
                e
            );
        }

        Ok(ForecastOutcome {
            run,
            current: projection.current,
            limit: projection.limit,
            trend: projection.trend,
            live_assessment: projection.live_assessment,
            events,
            warnings: projection.warnings,
            persistence,
        })
    }

    pub async fn latest_forecast(&self) -> RepositoryResult<Option<ForecastRun>> {
        self.bounded("latest_forecast_run", db::latest_forecast_run(self.repository.as_ref()))
            .await
    }

    /// One event per breaching point of `run`.
    pub fn breach_events(run: &ForecastRun, limit: &OperationalLimit) -> Vec<ForecastEvent> {
        run.breaches()
            .filter_map(|p| ForecastEvent::from_point(run.generated_at, p, limit))
            .collect()
    }

    fn check_horizon(&self, horizon: u32) -> Result<(), ForecastError> {
        if horizon == 0 || horizon > self.config.max_horizon {
            return Err(ForecastError::InvalidHorizon {
                requested: horizon,
                max: self.config.max_horizon,
            });
        }
        Ok(())
    }

    async fn persist(
        &self,
        run: &ForecastRun,
        events: &[ForecastEvent],
    ) -> Result<(), PersistenceError> {
        self.bounded(
            "store_forecast_run",
            db::store_forecast_run(self.repository.as_ref(), run),
        )
        .await
        .map_err(|source| PersistenceError {
            stage: PersistenceStage::ForecastRun,
            source,
        })?;

        if !events.is_empty() {
            self.bounded("record_events", self.repository.record_events(events))
                .await
                .map_err(|source| PersistenceError {
                    stage: PersistenceStage::Events,
                    source,
                })?;
            log::info!("Recorded {} breach events for run {}", events.len(), run.generated_at);
        }
        Ok(())
    }

    async fn yard_limit(&self, warnings: &mut Vec<ForecastWarning>) -> OperationalLimit {
        match self
            .bounded("limits_for", self.repository.limits_for(YARD_STOCK_VARIABLE))
            .await
        {
            Ok(Some(limit)) => return limit,
            Ok(None) => {}
            Err(e) => warnings.push(ForecastWarning::store_read("limits_for", &e).logged()),
        }
        warnings.push(
            ForecastWarning::DefaultLimits {
                variable: YARD_STOCK_VARIABLE.to_string(),
            }
            .logged(),
        );
        OperationalLimit::default_yard_stock()
    }

    async fn trend_at(&self, anchor: DateTime<Utc>, warnings: &mut Vec<ForecastWarning>) -> Trend {
        let since = anchor - self.config.trend_window();
        let window = match self
            .bounded("snapshots_since", self.repository.snapshots_since(since))
            .await
        {
            Ok(window) => window,
            Err(e) => {
                warnings.push(ForecastWarning::store_read("snapshots_since", &e).logged());
                Vec::new()
            }
        };

        let trend = endpoint_trend(&window);
        if !trend.reliable {
            warnings.push(
                ForecastWarning::FlatTrend {
                    samples: trend.samples,
                }
                .logged(),
            );
        }
        trend
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> RepositoryResult<T>
    where
        F: std::future::Future<Output = RepositoryResult<T>>,
    {
        bounded(operation, self.config.store_timeout(), call).await
    }
}

#[cfg(test)]
#[path = "forecast_tests.rs"]
mod forecast_tests;
