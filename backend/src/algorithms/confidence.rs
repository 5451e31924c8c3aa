//! Horizon confidence schedule and uncertainty banding.

use serde::{Deserialize, Serialize};

/// Confidence per horizon 1..=9.
pub const DEFAULT_SCHEDULE: [f64; 9] = [0.95, 0.92, 0.88, 0.82, 0.75, 0.68, 0.60, 0.52, 0.45];
/// Confidence for horizons past the end of the schedule.
pub const DEFAULT_FLOOR: f64 = 0.40;

/// Fixed, non-increasing confidence schedule indexed by horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule")]
pub struct ConfidenceSchedule {
    values: Vec<f64>,
    floor: f64,
}

#[derive(Deserialize)]
struct RawSchedule {
    values: Vec<f64>,
    floor: f64,
}

impl TryFrom<RawSchedule> for ConfidenceSchedule {
    type Error = String;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        ConfidenceSchedule::new(raw.values, raw.floor)
    }
}

impl Default for ConfidenceSchedule {
    fn default() -> Self {
        Self {
            values: DEFAULT_SCHEDULE.to_vec(),
            floor: DEFAULT_FLOOR,
        }
    }
}

impl ConfidenceSchedule {
    /// Build a schedule. Every value (and the floor) must lie in (0, 1], the
    /// schedule must not increase, and the floor must not exceed its last entry.
    pub fn new(values: Vec<f64>, floor: f64) -> Result<Self, String> {
        let in_range = |c: f64| c > 0.0 && c <= 1.0;
        if let Some(bad) = values.iter().copied().find(|c| !in_range(*c)) {
            return Err(format!("confidence {} is outside (0, 1]", bad));
        }
        if !in_range(floor) {
            return Err(format!("confidence floor {} is outside (0, 1]", floor));
        }
        if values.windows(2).any(|w| w[1] > w[0]) {
            return Err("confidence schedule must be non-increasing".to_string());
        }
        if let Some(last) = values.last() {
            if floor > *last {
                return Err(format!(
                    "confidence floor {} exceeds last scheduled value {}",
                    floor, last
                ));
            }
        }
        Ok(Self { values, floor })
    }

    /// Confidence for `horizon` hours ahead (1-based).
    pub fn confidence(&self, horizon: u32) -> f64 {
        if horizon == 0 {
            return self.values.first().copied().unwrap_or(self.floor);
        }
        self.values
            .get(horizon as usize - 1)
            .copied()
            .unwrap_or(self.floor)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }
}

/// Projected band around a stock estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    pub lower: f64,
    pub upper: f64,
}

/// Half-width of the band: summed deviations widened as confidence drops.
pub fn uncertainty_width(inflow_stddev: f64, outflow_stddev: f64, confidence: f64) -> f64 {
    (inflow_stddev + outflow_stddev) * (1.0 + (1.0 - confidence))
}

/// Band around `stock`; the lower bound never goes below zero.
pub fn uncertainty_band(
    stock: f64,
    inflow_stddev: f64,
    outflow_stddev: f64,
    confidence: f64,
) -> UncertaintyBand {
    let width = uncertainty_width(inflow_stddev, outflow_stddev, confidence);
    UncertaintyBand {
        lower: (stock - width).max(0.0),
        upper: stock + width,
    }
}
