//! Endpoint-difference trend over a window of snapshots.

use serde::{Deserialize, Serialize};

use crate::models::{hours_between, OperationalSnapshot};

/// Fewest samples needed before a trend is trusted.
pub const MIN_TREND_SAMPLES: usize = 3;

/// Per-hour rate of change of the yard quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub stock_per_hour: f64,
    pub inflow_per_hour: f64,
    pub outflow_per_hour: f64,
    pub samples: usize,
    /// False when the flat fallback was used
    pub reliable: bool,
}

impl Trend {
    pub fn flat(samples: usize) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }
}

/// Trend from the earliest and latest samples in `window`, divided by the
/// elapsed hours. Fewer than [`MIN_TREND_SAMPLES`] samples, or no elapsed
/// time, yields a flat trend.
pub fn endpoint_trend(window: &[OperationalSnapshot]) -> Trend {
    if window.len() < MIN_TREND_SAMPLES {
        return Trend::flat(window.len());
    }

    let first = window.iter().min_by_key(|s| s.timestamp);
    let last = window.iter().max_by_key(|s| s.timestamp);
    let (Some(first), Some(last)) = (first, last) else {
        return Trend::flat(window.len());
    };

    let hours = hours_between(first.timestamp, last.timestamp);
    if hours <= 0.0 {
        return Trend::flat(window.len());
    }

    Trend {
        stock_per_hour: (last.yard_stock.value() - first.yard_stock.value()) / hours,
        inflow_per_hour: (last.inflow() - first.inflow()) / hours,
        outflow_per_hour: (last.outflow() - first.outflow()) / hours,
        samples: window.len(),
        reliable: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use qtty::Tonnes;

    fn sample(at: DateTime<Utc>, stock: f64, inflow: f64, outflow: f64) -> OperationalSnapshot {
        OperationalSnapshot {
            timestamp: at,
            yard_stock: Tonnes::new(stock),
            yard_stock_physical: None,
            inflow_rate_tph: Some(inflow),
            outflow_rate_tph: Some(outflow),
            harvest_rate_tph: 60.0,
            mill_rate_tph: outflow,
            trucks_en_route: 0,
        }
    }

    #[test]
    fn test_endpoint_difference() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let window = vec![
            sample(t0, 1000.0, 80.0, 90.0),
            sample(t0 + Duration::minutes(30), 1200.0, 10.0, 10.0),
            sample(t0 + Duration::hours(2), 1100.0, 100.0, 86.0),
        ];
        let trend = endpoint_trend(&window);
        assert!(trend.reliable);
        assert!((trend.stock_per_hour - 50.0).abs() < 1e-9);
        assert!((trend.inflow_per_hour - 10.0).abs() < 1e-9);
        assert!((trend.outflow_per_hour + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unordered_window_uses_time_endpoints() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let window = vec![
            sample(t0 + Duration::hours(1), 1100.0, 80.0, 90.0),
            sample(t0, 1000.0, 80.0, 90.0),
            sample(t0 + Duration::minutes(30), 1050.0, 80.0, 90.0),
        ];
        assert!((endpoint_trend(&window).stock_per_hour - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_window_is_flat() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let window = vec![
            sample(t0, 1000.0, 80.0, 90.0),
            sample(t0 + Duration::hours(1), 1400.0, 120.0, 90.0),
        ];
        let trend = endpoint_trend(&window);
        assert!(!trend.reliable);
        assert_eq!(trend.stock_per_hour, 0.0);
        assert_eq!(trend.samples, 2);
    }

    #[test]
    fn test_zero_elapsed_time_is_flat() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let window = vec![
            sample(t0, 1000.0, 80.0, 90.0),
            sample(t0, 1100.0, 80.0, 90.0),
            sample(t0, 1200.0, 80.0, 90.0),
        ];
        assert_eq!(endpoint_trend(&window), Trend::flat(3));
    }
}
