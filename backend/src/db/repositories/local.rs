//! In-memory repository.
//!
//! Keeps every store in process memory behind a single lock. Used as the
//! default backend for development and by the test suite, which relies on
//! the [`LocalRepository::set_healthy`] and [`LocalRepository::set_read_only`]
//! hooks to exercise degraded paths.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::db::repository::*;
use crate::models::{
    ForecastEvent, ForecastRun, HourlyPattern, OperationalLimit, OperationalSnapshot,
};

#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    /// Sorted by timestamp
    snapshots: Vec<OperationalSnapshot>,
    patterns: HashMap<(u8, u8), HourlyPattern>,
    limits: HashMap<String, OperationalLimit>,
    forecast_runs: BTreeMap<DateTime<Utc>, ForecastRun>,
    events: Vec<ForecastEvent>,
    is_healthy: bool,
    read_only: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
            patterns: HashMap::new(),
            limits: HashMap::new(),
            forecast_runs: BTreeMap::new(),
            events: Vec::new(),
            is_healthy: true,
            read_only: false,
        }
    }
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Simulate a lost connection: every call fails with a connection error.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Simulate a store that accepts reads but rejects all writes.
    pub fn set_read_only(&self, read_only: bool) {
        self.data.write().read_only = read_only;
    }

    /// Drop all stored data, keeping the health flags.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            read_only: data.read_only,
            ..Default::default()
        };
    }

    pub fn snapshot_count(&self) -> usize {
        self.data.read().snapshots.len()
    }

    pub fn forecast_run_count(&self) -> usize {
        self.data.read().forecast_runs.len()
    }

    pub fn event_count(&self) -> usize {
        self.data.read().events.len()
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Local store is not healthy"));
        }
        Ok(())
    }

    fn check_writable(&self, operation: &str) -> RepositoryResult<()> {
        self.check_health()?;
        if self.data.read().read_only {
            return Err(RepositoryError::connection_with_context(
                "Local store is read-only",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeSeriesRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn append_snapshot(&self, snapshot: &OperationalSnapshot) -> RepositoryResult<()> {
        self.check_writable("append_snapshot")?;
        let mut data = self.data.write();
        let pos = data
            .snapshots
            .partition_point(|s| s.timestamp <= snapshot.timestamp);
        data.snapshots.insert(pos, snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self) -> RepositoryResult<Option<OperationalSnapshot>> {
        self.check_health()?;
        Ok(self.data.read().snapshots.last().cloned())
    }

    async fn snapshots_since(
        &self,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<OperationalSnapshot>> {
        self.check_health()?;
        let data = self.data.read();
        let start = data.snapshots.partition_point(|s| s.timestamp <= since);
        Ok(data.snapshots[start..].to_vec())
    }
}

#[async_trait]
impl PatternRepository for LocalRepository {
    async fn pattern_for(
        &self,
        hour_of_day: u8,
        weekday: u8,
    ) -> RepositoryResult<Option<HourlyPattern>> {
        self.check_health()?;
        Ok(self.data.read().patterns.get(&(hour_of_day, weekday)).cloned())
    }

    async fn upsert_pattern(&self, pattern: &HourlyPattern) -> RepositoryResult<()> {
        self.check_writable("upsert_pattern")?;
        pattern.validate().map_err(|e| {
            RepositoryError::validation_with_context(
                e,
                ErrorContext::new("upsert_pattern").with_entity("hourly_pattern"),
            )
        })?;
        self.data.write().patterns.insert(pattern.key(), pattern.clone());
        Ok(())
    }

    async fn list_patterns(&self) -> RepositoryResult<Vec<HourlyPattern>> {
        self.check_health()?;
        let mut patterns: Vec<HourlyPattern> =
            self.data.read().patterns.values().cloned().collect();
        patterns.sort_by_key(|p| (p.weekday, p.hour_of_day));
        Ok(patterns)
    }
}

#[async_trait]
impl LimitsRepository for LocalRepository {
    async fn limits_for(&self, variable: &str) -> RepositoryResult<Option<OperationalLimit>> {
        self.check_health()?;
        Ok(self.data.read().limits.get(variable).cloned())
    }

    async fn upsert_limit(&self, limit: &OperationalLimit) -> RepositoryResult<()> {
        self.check_writable("upsert_limit")?;
        limit.validate().map_err(|e| {
            RepositoryError::validation_with_context(
                e,
                ErrorContext::new("upsert_limit")
                    .with_entity("operational_limit")
                    .with_entity_id(&limit.variable),
            )
        })?;
        self.data
            .write()
            .limits
            .insert(limit.variable.clone(), limit.clone());
        Ok(())
    }

    async fn list_limits(&self) -> RepositoryResult<Vec<OperationalLimit>> {
        self.check_health()?;
        let mut limits: Vec<OperationalLimit> = self.data.read().limits.values().cloned().collect();
        limits.sort_by(|a, b| a.variable.cmp(&b.variable));
        Ok(limits)
    }
}

#[async_trait]
impl ForecastRepository for LocalRepository {
    async fn store_forecast_run(&self, run: &ForecastRun) -> RepositoryResult<()> {
        self.check_writable("store_forecast_run")?;
        let mut points = run.points.clone();
        points.sort_by_key(|p| p.horizon);
        let stored = ForecastRun {
            points,
            ..run.clone()
        };
        match self.data.write().forecast_runs.entry(run.generated_at) {
            Entry::Occupied(_) => Err(RepositoryError::conflict_with_context(
                "A forecast run with this generation timestamp is already stored",
                ErrorContext::new("store_forecast_run")
                    .with_entity("forecast_run")
                    .with_entity_id(run.generated_at),
            )),
            Entry::Vacant(slot) => {
                slot.insert(stored);
                Ok(())
            }
        }
    }

    async fn latest_forecast_run(&self) -> RepositoryResult<Option<ForecastRun>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .forecast_runs
            .last_key_value()
            .map(|(_, run)| run.clone()))
    }

    async fn forecast_run_at(
        &self,
        generated_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<ForecastRun>> {
        self.check_health()?;
        Ok(self.data.read().forecast_runs.get(&generated_at).cloned())
    }

    async fn list_forecast_generations(
        &self,
        limit: usize,
    ) -> RepositoryResult<Vec<DateTime<Utc>>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .forecast_runs
            .keys()
            .rev()
            .take(limit)
            .copied()
            .collect())
    }

    async fn prune_forecast_runs_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
        self.check_writable("prune_forecast_runs_before")?;
        let mut data = self.data.write();
        let kept = data.forecast_runs.split_off(&cutoff);
        let removed = data.forecast_runs.len();
        data.forecast_runs = kept;
        Ok(removed)
    }
}

#[async_trait]
impl EventRepository for LocalRepository {
    async fn record_events(&self, events: &[ForecastEvent]) -> RepositoryResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.check_writable("record_events")?;
        self.data.write().events.extend_from_slice(events);
        Ok(())
    }

    async fn recent_events(&self, limit: usize) -> RepositoryResult<Vec<ForecastEvent>> {
        self.check_health()?;
        let mut events = self.data.read().events.clone();
        events.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then(a.horizon.cmp(&b.horizon))
        });
        events.truncate(limit);
        Ok(events)
    }

    async fn prune_events_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<usize> {
        self.check_writable("prune_events_before")?;
        let mut data = self.data.write();
        let before = data.events.len();
        data.events.retain(|e| e.generated_at >= cutoff);
        Ok(before - data.events.len())
    }
}
