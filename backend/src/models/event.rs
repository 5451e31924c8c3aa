//! Breach events emitted for the event recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::forecast::{ForecastPoint, RootCause};
use super::limits::OperationalLimit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSeverity {
    /// Outside the normal band, inside the critical band
    Warning,
    /// Beyond the critical band
    Critical,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Warning => "WARNING",
            EventSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::str::FromStr for EventSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WARNING" => Ok(EventSeverity::Warning),
            "CRITICAL" => Ok(EventSeverity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Structured record of one projected limit breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEvent {
    pub generated_at: DateTime<Utc>,
    pub horizon: u32,
    /// Instant the breach is projected for
    pub projected_at: DateTime<Utc>,
    pub variable: String,
    pub projected_value: f64,
    /// The normal-band bound that was crossed
    pub limit_breached: f64,
    pub root_cause: RootCause,
    pub root_cause_magnitude: f64,
    pub severity: EventSeverity,
    pub description: String,
}

impl ForecastEvent {
    /// Build the event for a breaching point; `None` when the point is within limits.
    pub fn from_point(
        generated_at: DateTime<Utc>,
        point: &ForecastPoint,
        limit: &OperationalLimit,
    ) -> Option<Self> {
        if point.within_limits {
            return None;
        }
        let root_cause = point.root_cause?;
        let value = point.projected_stock.value();

        let limit_breached = if value > limit.upper {
            limit.upper
        } else {
            limit.lower
        };
        let severity = if limit.within_critical(value) {
            EventSeverity::Warning
        } else {
            EventSeverity::Critical
        };
        let direction = if value > limit.upper { "above" } else { "below" };

        Some(Self {
            generated_at,
            horizon: point.horizon,
            projected_at: point.timestamp,
            variable: limit.variable.clone(),
            projected_value: value,
            limit_breached,
            root_cause,
            root_cause_magnitude: point.root_cause_magnitude.unwrap_or(value),
            severity,
            description: format!(
                "{} projected at {:.0} {} {} limit {:.0} in {}h: {}",
                limit.variable,
                value,
                limit.unit,
                direction,
                limit_breached,
                point.horizon,
                root_cause.describe()
            ),
        })
    }

    pub fn is_critical(&self) -> bool {
        self.severity == EventSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use qtty::Tonnes;

    fn breaching_point(stock: f64, cause: RootCause) -> ForecastPoint {
        let ts = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        ForecastPoint {
            horizon: 2,
            timestamp: ts,
            projected_stock: Tonnes::new(stock),
            projected_inflow: 120.0,
            projected_outflow: 70.0,
            lower_bound: Tonnes::new(stock - 30.0),
            upper_bound: Tonnes::new(stock + 30.0),
            confidence: 0.92,
            root_cause: Some(cause),
            root_cause_magnitude: Some(120.0),
            within_limits: false,
        }
    }

    #[test]
    fn test_warning_inside_critical_band() {
        let limit = OperationalLimit::default_yard_stock();
        let generated = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let event = ForecastEvent::from_point(
            generated,
            &breaching_point(1600.0, RootCause::ExcessiveArrivals),
            &limit,
        )
        .unwrap();
        assert_eq!(event.severity, EventSeverity::Warning);
        assert_eq!(event.limit_breached, 1500.0);
        assert_eq!(event.root_cause_magnitude, 120.0);
        assert!(event.description.contains("above"));
    }

    #[test]
    fn test_critical_below_critical_lower() {
        let limit = OperationalLimit::default_yard_stock();
        let generated = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let event = ForecastEvent::from_point(
            generated,
            &breaching_point(500.0, RootCause::HighMilling),
            &limit,
        )
        .unwrap();
        assert!(event.is_critical());
        assert_eq!(event.limit_breached, 800.0);
    }

    #[test]
    fn test_no_event_for_point_within_limits() {
        let limit = OperationalLimit::default_yard_stock();
        let mut p = breaching_point(1000.0, RootCause::LowMilling);
        p.within_limits = true;
        p.root_cause = None;
        assert!(ForecastEvent::from_point(Utc::now(), &p, &limit).is_none());
    }
}
