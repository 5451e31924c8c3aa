//! Periodic forecast generation.
//!
//! The scheduler calls [`ForecastEngine::run_forecast`] on a fixed interval,
//! publishes each completed run to subscribers and applies the retention
//! window. A run that overlaps the next tick is skipped rather than queued.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::forecast::ForecastEngine;
use crate::db;
use crate::models::ForecastRun;

/// `[scheduler]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub interval_secs: u64,
    pub run_timeout_secs: u64,
    /// Forecast runs and their breach events older than this are pruned
    pub retention_days: i64,
    /// Critical breaches within this many hours are logged as alerts
    pub alert_horizons: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            run_timeout_secs: 30,
            retention_days: 7,
            alert_horizons: 3,
        }
    }
}

/// What happened on one scheduler tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed {
        generated_at: DateTime<Utc>,
        persisted: bool,
        breaches: usize,
    },
    NotWarmedUp,
    TimedOut,
    Failed(String),
}

pub struct ForecastScheduler {
    engine: ForecastEngine,
    settings: SchedulerSettings,
    runs: broadcast::Sender<ForecastRun>,
}

impl ForecastScheduler {
    pub fn new(
        engine: ForecastEngine,
        settings: SchedulerSettings,
        runs: broadcast::Sender<ForecastRun>,
    ) -> Self {
        Self {
            engine,
            settings,
            runs,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForecastRun> {
        self.runs.subscribe()
    }

    /// Run one forecast generation, then prune expired runs and events.
    pub async fn tick(&self) -> TickOutcome {
        let horizon = self.engine.default_horizon();
        let limit = Duration::from_secs(self.settings.run_timeout_secs);

        let outcome = match tokio::time::timeout(limit, self.engine.run_forecast(horizon)).await {
            Err(_) => {
                log::error!("Forecast run exceeded {:?}; result discarded", limit);
                return TickOutcome::TimedOut;
            }
            Ok(Err(e)) if e.is_no_data() => {
                log::info!("Forecast skipped: system not warmed up ({})", e);
                return TickOutcome::NotWarmedUp;
            }
            Ok(Err(e)) => {
                log::error!("Forecast run failed: {}", e);
                return TickOutcome::Failed(e.to_string());
            }
            Ok(Ok(outcome)) => outcome,
        };

        for event in outcome
            .events
            .iter()
            .filter(|e| e.is_critical() && e.horizon <= self.settings.alert_horizons)
        {
            log::warn!("ALERT: {}", event.description);
        }

        if self.runs.send(outcome.run.clone()).is_err() {
            log::debug!("No subscribers for forecast run {}", outcome.run.generated_at);
        }

        self.prune().await;

        TickOutcome::Completed {
            generated_at: outcome.run.generated_at,
            persisted: outcome.is_persisted(),
            breaches: outcome.events.len(),
        }
    }

    async fn prune(&self) {
        let cutoff = self.engine.now() - chrono::Duration::days(self.settings.retention_days);
        if let Err(e) = db::prune_history(self.engine.repository().as_ref(), cutoff).await {
            log::warn!("Retention pass failed: {}", e);
        }
    }

    /// Tick every `interval_secs` until `shutdown` turns true. The first tick
    /// fires immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.settings.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!(
            "Forecast scheduler started (every {}s, {}h horizon)",
            self.settings.interval_secs,
            self.engine.default_horizon()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        log::info!("Forecast scheduler stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FullRepository, ForecastRepository, LocalRepository, TimeSeriesRepository};
    use crate::models::{OperationalSnapshot, PatternSource};
    use crate::services::{Clock, FixedClock, ForecastConfig};
    use chrono::TimeZone;
    use qtty::Tonnes;
    use std::sync::Arc;

    fn setup() -> (LocalRepository, FixedClock, ForecastScheduler) {
        let repo = LocalRepository::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap());
        let repository: Arc<dyn FullRepository> = Arc::new(repo.clone());
        let engine =
            ForecastEngine::new(repository, ForecastConfig::default(), Arc::new(clock.clone()))
                .unwrap();
        let (runs, _) = broadcast::channel(4);
        let scheduler = ForecastScheduler::new(engine, SchedulerSettings::default(), runs);
        (repo, clock, scheduler)
    }

    async fn seed(repo: &LocalRepository, at: DateTime<Utc>, stock: f64) {
        repo.append_snapshot(&OperationalSnapshot {
            timestamp: at,
            yard_stock: Tonnes::new(stock),
            yard_stock_physical: None,
            inflow_rate_tph: Some(80.0),
            outflow_rate_tph: Some(85.0),
            harvest_rate_tph: 80.0,
            mill_rate_tph: 85.0,
            trucks_en_route: 0,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_tick_before_warm_up() {
        let (_repo, _clock, scheduler) = setup();
        assert_eq!(scheduler.tick().await, TickOutcome::NotWarmedUp);
    }

    #[tokio::test]
    async fn test_tick_publishes_run() {
        let (repo, clock, scheduler) = setup();
        seed(&repo, clock.now() - chrono::Duration::minutes(2), 1000.0).await;
        let mut rx = scheduler.subscribe();

        let outcome = scheduler.tick().await;
        assert!(matches!(
            outcome,
            TickOutcome::Completed {
                persisted: true,
                ..
            }
        ));
        let run = rx.recv().await.unwrap();
        assert_eq!(run.generated_at, clock.now());
        assert_eq!(run.horizon(), 9);
    }

    #[tokio::test]
    async fn test_tick_prunes_expired_runs_only() {
        let (repo, clock, scheduler) = setup();
        seed(&repo, clock.now() - chrono::Duration::days(10), 900.0).await;
        seed(&repo, clock.now() - chrono::Duration::minutes(2), 1000.0).await;

        let stale = ForecastRun::new(clock.now() - chrono::Duration::days(8), Vec::new());
        repo.store_forecast_run(&stale).await.unwrap();

        scheduler.tick().await;
        assert_eq!(repo.forecast_run_count(), 1);
        assert_eq!(repo.latest_forecast_run().await.unwrap().unwrap().generated_at, clock.now());
        assert_eq!(repo.snapshot_count(), 2);
    }

    #[tokio::test]
    async fn test_retention_keeps_rolling_window_history() {
        let (repo, clock, mut scheduler) = setup();
        scheduler.settings.retention_days = 1;
        // Saturday 10:20, inside the 7-day window
        seed(&repo, clock.now() - chrono::Duration::days(2) + chrono::Duration::minutes(140), 950.0)
            .await;
        seed(&repo, clock.now() - chrono::Duration::minutes(2), 1000.0).await;

        let engine = scheduler.engine.clone();
        let before = engine.historical_pattern(10, 0).await;
        assert_eq!(before.source, PatternSource::RollingAggregate);

        scheduler.tick().await;

        let after = engine.historical_pattern(10, 0).await;
        assert_eq!(after.source, PatternSource::RollingAggregate);
        assert_eq!(repo.snapshot_count(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_repo, _clock, scheduler) = setup();
        let (tx, rx) = watch::channel(false);
        let handle = scheduler.spawn(rx);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
