//! Historical pattern resolution with ordered fallback tiers.
//!
//! Tiers are tried in [`PatternTier::ORDER`] and the first one that yields a
//! pattern wins: the exact `(hour, weekday)` bucket, then an aggregate of the
//! trailing rolling window for the same hour across all weekdays, then the
//! static cold-start defaults. Store failures on one tier fall through to the
//! next with a warning.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use super::bounded;
use super::error::ForecastWarning;
use crate::db::{FullRepository, PatternRepository, TimeSeriesRepository};
use crate::models::{
    HourlyPattern, OperationalSnapshot, PatternKey, PatternSource, ResolvedPattern,
    DEFAULT_SPEED_KMH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTier {
    Exact,
    RollingAggregate,
    StaticDefault,
}

impl PatternTier {
    pub const ORDER: [PatternTier; 3] = [
        PatternTier::Exact,
        PatternTier::RollingAggregate,
        PatternTier::StaticDefault,
    ];

    fn source(self) -> PatternSource {
        match self {
            PatternTier::Exact => PatternSource::Exact,
            PatternTier::RollingAggregate => PatternSource::RollingAggregate,
            PatternTier::StaticDefault => PatternSource::StaticDefault,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub truck_load_tons: f64,
    pub min_pattern_samples: u32,
    pub rolling_window: chrono::Duration,
    pub offset: FixedOffset,
    pub store_timeout: Duration,
}

/// Resolves patterns for one forecast run.
///
/// The rolling window is read from the time series at most once per
/// resolver and reused for every horizon.
pub struct PatternResolver<'a> {
    repo: &'a dyn FullRepository,
    settings: &'a ResolverSettings,
    now: DateTime<Utc>,
    rolling_window: Option<Vec<OperationalSnapshot>>,
    warnings: Vec<ForecastWarning>,
}

impl<'a> PatternResolver<'a> {
    pub fn new(
        repo: &'a dyn FullRepository,
        settings: &'a ResolverSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            repo,
            settings,
            now,
            rolling_window: None,
            warnings: Vec::new(),
        }
    }

    pub async fn resolve(&mut self, key: PatternKey) -> ResolvedPattern {
        for tier in PatternTier::ORDER {
            if let Some(pattern) = self.try_tier(tier, key).await {
                if tier != PatternTier::Exact {
                    self.warnings.push(
                        ForecastWarning::PatternFallback {
                            hour_of_day: key.hour_of_day,
                            weekday: key.weekday,
                            tier: tier.source(),
                        }
                        .logged(),
                    );
                }
                return ResolvedPattern::new(pattern, tier.source(), self.settings.truck_load_tons);
            }
        }
        // StaticDefault always yields
        ResolvedPattern::new(
            HourlyPattern::static_default(key.hour_of_day, key.weekday, self.settings.truck_load_tons),
            PatternSource::StaticDefault,
            self.settings.truck_load_tons,
        )
    }

    pub fn into_warnings(self) -> Vec<ForecastWarning> {
        self.warnings
    }

    async fn try_tier(&mut self, tier: PatternTier, key: PatternKey) -> Option<HourlyPattern> {
        match tier {
            PatternTier::Exact => self.exact(key).await,
            PatternTier::RollingAggregate => {
                let settings = self.settings;
                let window = self.rolling_window().await;
                rolling_aggregate(window, key, settings)
            }
            PatternTier::StaticDefault => Some(HourlyPattern::static_default(
                key.hour_of_day,
                key.weekday,
                self.settings.truck_load_tons,
            )),
        }
    }

    async fn exact(&mut self, key: PatternKey) -> Option<HourlyPattern> {
        let read = bounded(
            "pattern_for",
            self.settings.store_timeout,
            self.repo.pattern_for(key.hour_of_day, key.weekday),
        )
        .await;

        match read {
            Ok(Some(p)) if p.sample_count >= self.settings.min_pattern_samples => Some(p),
            Ok(Some(p)) => {
                log::debug!(
                    "Pattern ({}, {}) has {} samples, below minimum {}",
                    key.hour_of_day,
                    key.weekday,
                    p.sample_count,
                    self.settings.min_pattern_samples
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                self.warnings
                    .push(ForecastWarning::store_read("pattern_for", &e).logged());
                None
            }
        }
    }

    async fn rolling_window(&mut self) -> &[OperationalSnapshot] {
        if self.rolling_window.is_none() {
            let since = self.now - self.settings.rolling_window;
            let read = bounded(
                "snapshots_since",
                self.settings.store_timeout,
                self.repo.snapshots_since(since),
            )
            .await;
            let window = match read {
                Ok(samples) => samples,
                Err(e) => {
                    self.warnings
                        .push(ForecastWarning::store_read("snapshots_since", &e).logged());
                    Vec::new()
                }
            };
            self.rolling_window = Some(window);
        }
        self.rolling_window.as_deref().unwrap_or_default()
    }
}

/// Mean rates over the samples of `window` falling in `key`'s local hour,
/// across all weekdays. `None` when no sample matches.
pub fn rolling_aggregate(
    window: &[OperationalSnapshot],
    key: PatternKey,
    settings: &ResolverSettings,
) -> Option<HourlyPattern> {
    let matching: Vec<&OperationalSnapshot> = window
        .iter()
        .filter(|s| PatternKey::at(s.timestamp, settings.offset).hour_of_day == key.hour_of_day)
        .collect();
    if matching.is_empty() {
        return None;
    }

    let n = matching.len() as f64;
    let mean = |f: fn(&OperationalSnapshot) -> f64| matching.iter().map(|s| f(s)).sum::<f64>() / n;

    Some(HourlyPattern {
        hour_of_day: key.hour_of_day,
        weekday: key.weekday,
        harvest_rate_mean: mean(|s| s.harvest_rate_tph),
        mill_rate_mean: mean(|s| s.outflow()),
        truck_arrivals_mean: mean(|s| s.inflow()) / settings.truck_load_tons,
        speed_mean_kmh: DEFAULT_SPEED_KMH,
        harvest_rate_stddev: 0.0,
        mill_rate_stddev: 0.0,
        truck_arrivals_stddev: 0.0,
        speed_stddev_kmh: 0.0,
        sample_count: matching.len() as u32,
    })
}
