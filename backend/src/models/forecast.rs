//! Forecast points, runs and root-cause labels.

use chrono::{DateTime, Utc};
use qtty::Tonnes;
use serde::{Deserialize, Serialize};

use super::limits::OperationalLimit;

/// Model identifier persisted alongside every run.
pub const MODEL_VERSION: &str = "V2_TREND_HISTORY";

/// Probable cause of a projected limit breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RootCause {
    ExcessiveArrivals,
    HighHarvest,
    LowMilling,
    GradualAccumulation,
    FewArrivals,
    HighMilling,
    GradualDepletion,
}

impl RootCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootCause::ExcessiveArrivals => "EXCESSIVE_ARRIVALS",
            RootCause::HighHarvest => "HIGH_HARVEST",
            RootCause::LowMilling => "LOW_MILLING",
            RootCause::GradualAccumulation => "GRADUAL_ACCUMULATION",
            RootCause::FewArrivals => "FEW_ARRIVALS",
            RootCause::HighMilling => "HIGH_MILLING",
            RootCause::GradualDepletion => "GRADUAL_DEPLETION",
        }
    }

    /// Short operator-facing explanation.
    pub fn describe(&self) -> &'static str {
        match self {
            RootCause::ExcessiveArrivals => "truck arrivals above mill capacity",
            RootCause::HighHarvest => "harvest fronts producing above plan",
            RootCause::LowMilling => "mill crushing below nominal rate",
            RootCause::GradualAccumulation => "slow accumulation of yard stock",
            RootCause::FewArrivals => "too few trucks reaching the yard",
            RootCause::HighMilling => "mill consuming faster than supply",
            RootCause::GradualDepletion => "slow depletion of yard stock",
        }
    }

    pub fn is_accumulation(&self) -> bool {
        matches!(
            self,
            RootCause::ExcessiveArrivals
                | RootCause::HighHarvest
                | RootCause::LowMilling
                | RootCause::GradualAccumulation
        )
    }
}

impl std::fmt::Display for RootCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RootCause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXCESSIVE_ARRIVALS" => Ok(RootCause::ExcessiveArrivals),
            "HIGH_HARVEST" => Ok(RootCause::HighHarvest),
            "LOW_MILLING" => Ok(RootCause::LowMilling),
            "GRADUAL_ACCUMULATION" => Ok(RootCause::GradualAccumulation),
            "FEW_ARRIVALS" => Ok(RootCause::FewArrivals),
            "HIGH_MILLING" => Ok(RootCause::HighMilling),
            "GRADUAL_DEPLETION" => Ok(RootCause::GradualDepletion),
            other => Err(format!("unknown root cause '{}'", other)),
        }
    }
}

/// One projected hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub horizon: u32,
    pub timestamp: DateTime<Utc>,
    pub projected_stock: Tonnes,
    pub projected_inflow: f64,
    pub projected_outflow: f64,
    pub lower_bound: Tonnes,
    pub upper_bound: Tonnes,
    pub confidence: f64,
    pub root_cause: Option<RootCause>,
    pub root_cause_magnitude: Option<f64>,
    pub within_limits: bool,
}

impl ForecastPoint {
    pub fn balance(&self) -> f64 {
        self.projected_inflow - self.projected_outflow
    }
}

/// All points produced by one forecast generation.
///
/// A run is immutable once built and is always stored and loaded whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRun {
    pub generated_at: DateTime<Utc>,
    pub model_version: String,
    pub points: Vec<ForecastPoint>,
}

impl ForecastRun {
    pub fn new(generated_at: DateTime<Utc>, points: Vec<ForecastPoint>) -> Self {
        Self {
            generated_at,
            model_version: MODEL_VERSION.to_string(),
            points,
        }
    }

    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, horizon: u32) -> Option<&ForecastPoint> {
        self.points.iter().find(|p| p.horizon == horizon)
    }

    pub fn breaches(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| !p.within_limits)
    }

    /// Check the structural invariants every stored run must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.points.is_empty() {
            return Err("forecast run has no points".to_string());
        }

        let mut previous_confidence = f64::INFINITY;
        for (idx, point) in self.points.iter().enumerate() {
            let expected = idx as u32 + 1;
            if point.horizon != expected {
                return Err(format!(
                    "horizon {} found at position {}, expected {}",
                    point.horizon, idx, expected
                ));
            }
            if !(point.confidence > 0.0 && point.confidence <= 1.0) {
                return Err(format!(
                    "confidence {} at horizon {} is outside (0, 1]",
                    point.confidence, point.horizon
                ));
            }
            if point.confidence > previous_confidence {
                return Err(format!("confidence increases at horizon {}", point.horizon));
            }
            previous_confidence = point.confidence;

            if point.lower_bound.value() < 0.0 {
                return Err(format!("negative lower bound at horizon {}", point.horizon));
            }
            if point.root_cause.is_some() == point.within_limits {
                return Err(format!(
                    "root cause must be set exactly when the point breaches limits (horizon {})",
                    point.horizon
                ));
            }
        }
        Ok(())
    }

    /// Check that each point's limit classification matches `limit`.
    pub fn validate_against(&self, limit: &OperationalLimit) -> Result<(), String> {
        self.validate()?;
        for point in &self.points {
            if limit.contains(point.projected_stock.value()) != point.within_limits {
                return Err(format!(
                    "horizon {} classification disagrees with [{}, {}]",
                    point.horizon, limit.lower, limit.upper
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn point(horizon: u32, stock: f64, confidence: f64) -> ForecastPoint {
        let within = (800.0..=1500.0).contains(&stock);
        ForecastPoint {
            horizon,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
                + Duration::hours(horizon as i64),
            projected_stock: Tonnes::new(stock),
            projected_inflow: 80.0,
            projected_outflow: 90.0,
            lower_bound: Tonnes::new(stock - 20.0),
            upper_bound: Tonnes::new(stock + 20.0),
            confidence,
            root_cause: (!within).then_some(RootCause::GradualAccumulation),
            root_cause_magnitude: (!within).then_some(stock),
            within_limits: within,
        }
    }

    fn run(points: Vec<ForecastPoint>) -> ForecastRun {
        ForecastRun::new(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(), points)
    }

    #[test]
    fn test_valid_run() {
        let r = run(vec![point(1, 1000.0, 0.95), point(2, 1600.0, 0.92)]);
        assert!(r.validate().is_ok());
        assert_eq!(r.model_version, MODEL_VERSION);
        assert_eq!(r.breaches().count(), 1);
        assert!(r.validate_against(&OperationalLimit::default_yard_stock()).is_ok());
    }

    #[test]
    fn test_gap_in_horizons_rejected() {
        let r = run(vec![point(1, 1000.0, 0.95), point(3, 1000.0, 0.88)]);
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_increasing_confidence_rejected() {
        let r = run(vec![point(1, 1000.0, 0.90), point(2, 1000.0, 0.92)]);
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_root_cause_without_breach_rejected() {
        let mut p = point(1, 1000.0, 0.95);
        p.root_cause = Some(RootCause::LowMilling);
        assert!(run(vec![p]).validate().is_err());
    }

    #[test]
    fn test_root_cause_labels_round_trip_through_str() {
        for label in [
            RootCause::ExcessiveArrivals,
            RootCause::HighHarvest,
            RootCause::LowMilling,
            RootCause::GradualAccumulation,
            RootCause::FewArrivals,
            RootCause::HighMilling,
            RootCause::GradualDepletion,
        ] {
            assert_eq!(label.as_str().parse::<RootCause>().unwrap(), label);
        }
        assert_eq!(
            serde_json::to_string(&RootCause::HighHarvest).unwrap(),
            "\"HIGH_HARVEST\""
        );
    }
}
