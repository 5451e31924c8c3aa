//! Historical hourly patterns keyed by (hour-of-day, weekday).

use serde::{Deserialize, Serialize};

/// Average load of one truck, in tons.
pub const DEFAULT_TRUCK_LOAD_TONS: f64 = 70.0;
/// Inflow deviation used when the pattern carries none.
pub const DEFAULT_INFLOW_STDDEV_TPH: f64 = 10.0;
/// Outflow deviation used when the pattern carries none.
pub const DEFAULT_OUTFLOW_STDDEV_TPH: f64 = 8.0;

/// Cold-start means, used when neither a pattern row nor recent history exists.
pub const DEFAULT_HARVEST_RATE_TPH: f64 = 60.0;
pub const DEFAULT_MILL_RATE_TPH: f64 = 85.0;
pub const DEFAULT_INFLOW_TPH: f64 = 50.0;
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Statistics of one pattern bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPattern {
    /// 0..=23, mill local time
    pub hour_of_day: u8,
    /// 0..=6, Monday = 0
    pub weekday: u8,
    pub harvest_rate_mean: f64,
    pub mill_rate_mean: f64,
    pub truck_arrivals_mean: f64,
    pub speed_mean_kmh: f64,
    #[serde(default)]
    pub harvest_rate_stddev: f64,
    #[serde(default)]
    pub mill_rate_stddev: f64,
    #[serde(default)]
    pub truck_arrivals_stddev: f64,
    #[serde(default)]
    pub speed_stddev_kmh: f64,
    #[serde(default)]
    pub sample_count: u32,
}

impl HourlyPattern {
    /// Hard-coded bucket for a cold start. Deviations are zero so that the
    /// deviation defaults apply.
    pub fn static_default(hour_of_day: u8, weekday: u8, truck_load_tons: f64) -> Self {
        Self {
            hour_of_day,
            weekday,
            harvest_rate_mean: DEFAULT_HARVEST_RATE_TPH,
            mill_rate_mean: DEFAULT_MILL_RATE_TPH,
            truck_arrivals_mean: DEFAULT_INFLOW_TPH / truck_load_tons,
            speed_mean_kmh: DEFAULT_SPEED_KMH,
            harvest_rate_stddev: 0.0,
            mill_rate_stddev: 0.0,
            truck_arrivals_stddev: 0.0,
            speed_stddev_kmh: 0.0,
            sample_count: 0,
        }
    }

    pub fn key(&self) -> (u8, u8) {
        (self.hour_of_day, self.weekday)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.hour_of_day > 23 {
            return Err(format!("hour_of_day must be in 0..=23, got {}", self.hour_of_day));
        }
        if self.weekday > 6 {
            return Err(format!("weekday must be in 0..=6, got {}", self.weekday));
        }
        let fields = [
            ("harvest_rate_mean", self.harvest_rate_mean),
            ("mill_rate_mean", self.mill_rate_mean),
            ("truck_arrivals_mean", self.truck_arrivals_mean),
            ("speed_mean_kmh", self.speed_mean_kmh),
            ("harvest_rate_stddev", self.harvest_rate_stddev),
            ("mill_rate_stddev", self.mill_rate_stddev),
            ("truck_arrivals_stddev", self.truck_arrivals_stddev),
            ("speed_stddev_kmh", self.speed_stddev_kmh),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be non-negative, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Which fallback tier produced a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternSource {
    Exact,
    RollingAggregate,
    StaticDefault,
}

impl std::fmt::Display for PatternSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PatternSource::Exact => "exact",
            PatternSource::RollingAggregate => "rolling_aggregate",
            PatternSource::StaticDefault => "static_default",
        };
        f.write_str(s)
    }
}

/// A pattern together with the yard-flow rates derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPattern {
    pub pattern: HourlyPattern,
    pub source: PatternSource,
    pub inflow_mean: f64,
    pub outflow_mean: f64,
    pub inflow_stddev: f64,
    pub outflow_stddev: f64,
}

impl ResolvedPattern {
    pub fn new(pattern: HourlyPattern, source: PatternSource, truck_load_tons: f64) -> Self {
        let inflow_stddev = match pattern.truck_arrivals_stddev * truck_load_tons {
            s if s > 0.0 => s,
            _ => DEFAULT_INFLOW_STDDEV_TPH,
        };
        let outflow_stddev = if pattern.mill_rate_stddev > 0.0 {
            pattern.mill_rate_stddev
        } else {
            DEFAULT_OUTFLOW_STDDEV_TPH
        };

        Self {
            inflow_mean: pattern.truck_arrivals_mean * truck_load_tons,
            outflow_mean: pattern.mill_rate_mean,
            inflow_stddev,
            outflow_stddev,
            pattern,
            source,
        }
    }

    pub fn harvest_mean(&self) -> f64 {
        self.pattern.harvest_rate_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_default_derives_documented_rates() {
        let p = HourlyPattern::static_default(3, 1, DEFAULT_TRUCK_LOAD_TONS);
        let r = ResolvedPattern::new(p, PatternSource::StaticDefault, DEFAULT_TRUCK_LOAD_TONS);
        assert!((r.inflow_mean - 50.0).abs() < 1e-9);
        assert_eq!(r.outflow_mean, 85.0);
        assert_eq!(r.inflow_stddev, DEFAULT_INFLOW_STDDEV_TPH);
        assert_eq!(r.outflow_stddev, DEFAULT_OUTFLOW_STDDEV_TPH);
        assert_eq!(r.harvest_mean(), 60.0);
    }

    #[test]
    fn test_arrivals_scaled_by_truck_load() {
        let p = HourlyPattern {
            truck_arrivals_mean: 1.5,
            truck_arrivals_stddev: 0.2,
            mill_rate_stddev: 5.0,
            ..HourlyPattern::static_default(10, 4, 70.0)
        };
        let r = ResolvedPattern::new(p, PatternSource::Exact, 70.0);
        assert!((r.inflow_mean - 105.0).abs() < 1e-9);
        assert!((r.inflow_stddev - 14.0).abs() < 1e-9);
        assert_eq!(r.outflow_stddev, 5.0);
    }

    #[test]
    fn test_validate_rejects_bad_keys() {
        let mut p = HourlyPattern::static_default(0, 0, 70.0);
        assert!(p.validate().is_ok());
        p.hour_of_day = 24;
        assert!(p.validate().is_err());
        p.hour_of_day = 23;
        p.weekday = 7;
        assert!(p.validate().is_err());
        p.weekday = 6;
        p.mill_rate_stddev = -1.0;
        assert!(p.validate().is_err());
    }
}
