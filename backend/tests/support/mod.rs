#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use qtty::Tonnes;

use mill_jit::db::{FullRepository, LocalRepository, PatternRepository, TimeSeriesRepository};
use mill_jit::models::{HourlyPattern, OperationalSnapshot};
use mill_jit::services::{FixedClock, ForecastConfig, ForecastEngine};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Panic-safe (restores variables on unwind) and serialized, since env vars
/// are process-global and tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Monday 2025-06-02 08:00 UTC.
pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

pub fn snapshot(at: DateTime<Utc>, stock: f64, inflow: f64, outflow: f64) -> OperationalSnapshot {
    OperationalSnapshot {
        timestamp: at,
        yard_stock: Tonnes::new(stock),
        yard_stock_physical: None,
        inflow_rate_tph: Some(inflow),
        outflow_rate_tph: Some(outflow),
        harvest_rate_tph: 70.0,
        mill_rate_tph: outflow,
        trucks_en_route: 6,
    }
}

/// One snapshot a minute before [`anchor`].
pub async fn seed_current(repo: &LocalRepository, stock: f64, inflow: f64, outflow: f64) {
    repo.append_snapshot(&snapshot(anchor() - Duration::minutes(1), stock, inflow, outflow))
        .await
        .unwrap();
}

/// Exact patterns for every Monday hour.
pub async fn seed_monday_patterns(repo: &LocalRepository, inflow: f64, outflow: f64) {
    for hour in 0..24u8 {
        let pattern = HourlyPattern {
            truck_arrivals_mean: inflow / 70.0,
            mill_rate_mean: outflow,
            sample_count: 20,
            ..HourlyPattern::static_default(hour, 0, 70.0)
        };
        repo.upsert_pattern(&pattern).await.unwrap();
    }
}

pub fn engine_at(repo: &LocalRepository, clock: &FixedClock) -> ForecastEngine {
    let repository: Arc<dyn FullRepository> = Arc::new(repo.clone());
    ForecastEngine::new(repository, ForecastConfig::default(), Arc::new(clock.clone())).unwrap()
}
