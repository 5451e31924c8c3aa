//! Historical / trend blending weights.
//!
//! The historical share is scaled by confidence while the trend share stays
//! fixed, so the two weights do not sum to one. Callers that want a convex
//! combination should change [`blend_weights`] only; the projection loop does
//! not assume normalisation.

/// Multiplier applied to confidence for the historical share.
pub const HISTORICAL_FACTOR: f64 = 0.7;
/// Fixed share of the trend-extrapolated value.
pub const TREND_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub historical: f64,
    pub trend: f64,
}

impl BlendWeights {
    pub fn total(&self) -> f64 {
        self.historical + self.trend
    }
}

pub fn blend_weights(confidence: f64) -> BlendWeights {
    BlendWeights {
        historical: HISTORICAL_FACTOR * confidence,
        trend: TREND_WEIGHT,
    }
}

pub fn blend(historical: f64, trend: f64, weights: BlendWeights) -> f64 {
    historical * weights.historical + trend * weights.trend
}
