//! Multi-horizon yard stock projection.
//!
//! Each horizon depends on the previous projected state, so the loop is
//! strictly sequential. Patterns are resolved by the caller beforehand; this
//! module performs no I/O.

use chrono::{DateTime, Utc};
use qtty::Tonnes;

use super::blending::{blend, blend_weights};
use super::confidence::{uncertainty_band, ConfidenceSchedule};
use super::root_cause::{attribute, Attribution, AttributionInput, RootCauseThresholds};
use super::trend::Trend;
use crate::models::{horizon_instant, ForecastPoint, OperationalLimit, ResolvedPattern};

/// Live starting point of a projection (horizon 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionState {
    pub stock: f64,
    pub inflow: f64,
    pub outflow: f64,
}

pub struct ProjectionInput<'a> {
    pub anchor: DateTime<Utc>,
    pub start: ProjectionState,
    pub trend: Trend,
    /// One resolved pattern per horizon, index 0 is horizon 1
    pub patterns: &'a [ResolvedPattern],
    pub limit: &'a OperationalLimit,
    pub schedule: &'a ConfidenceSchedule,
    pub thresholds: &'a RootCauseThresholds,
}

/// Project `input.patterns.len()` horizons.
pub fn project_horizons(input: &ProjectionInput<'_>) -> Vec<ForecastPoint> {
    let mut previous = input.start;
    let mut points = Vec::with_capacity(input.patterns.len());

    for (idx, pattern) in input.patterns.iter().enumerate() {
        let horizon = idx as u32 + 1;
        let confidence = input.schedule.confidence(horizon);
        let weights = blend_weights(confidence);

        let trend_inflow = previous.inflow + input.trend.inflow_per_hour;
        let trend_outflow = previous.outflow + input.trend.outflow_per_hour;
        let inflow = blend(pattern.inflow_mean, trend_inflow, weights).max(0.0);
        let outflow = blend(pattern.outflow_mean, trend_outflow, weights).max(0.0);

        let stock = previous.stock + (inflow - outflow);
        let band = uncertainty_band(
            stock,
            pattern.inflow_stddev,
            pattern.outflow_stddev,
            confidence,
        );

        let attribution = classify(
            stock,
            inflow,
            outflow,
            pattern.harvest_mean(),
            input.limit,
            input.thresholds,
        );

        points.push(ForecastPoint {
            horizon,
            timestamp: horizon_instant(input.anchor, horizon),
            projected_stock: Tonnes::new(stock),
            projected_inflow: inflow,
            projected_outflow: outflow,
            lower_bound: Tonnes::new(band.lower),
            upper_bound: Tonnes::new(band.upper),
            confidence,
            root_cause: attribution.map(|a| a.root_cause),
            root_cause_magnitude: attribution.map(|a| a.magnitude),
            within_limits: attribution.is_none(),
        });

        previous = ProjectionState {
            stock,
            inflow,
            outflow,
        };
    }

    points
}

/// Attribute `stock` against the normal band of `limit`; `None` when within.
pub fn classify(
    stock: f64,
    inflow: f64,
    outflow: f64,
    harvest: f64,
    limit: &OperationalLimit,
    thresholds: &RootCauseThresholds,
) -> Option<Attribution> {
    attribute(
        &AttributionInput {
            stock,
            inflow,
            outflow,
            harvest,
            lower: limit.lower,
            upper: limit.upper,
        },
        thresholds,
    )
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod projection_tests;
