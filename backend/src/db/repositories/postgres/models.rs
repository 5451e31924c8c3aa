use chrono::{DateTime, Utc};
use diesel::prelude::*;
use qtty::Tonnes;

use super::schema::{
    forecast_events, forecast_points, hourly_patterns, operational_limits, operational_snapshots,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    EventSeverity, ForecastEvent, ForecastPoint, HourlyPattern, OperationalLimit,
    OperationalSnapshot, RootCause,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = operational_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct SnapshotRow {
    pub snapshot_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub yard_stock_t: f64,
    pub yard_stock_physical_t: Option<f64>,
    pub inflow_tph: Option<f64>,
    pub outflow_tph: Option<f64>,
    pub harvest_tph: f64,
    pub mill_tph: f64,
    pub trucks_en_route: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = operational_snapshots)]
pub struct NewSnapshotRow {
    pub recorded_at: DateTime<Utc>,
    pub yard_stock_t: f64,
    pub yard_stock_physical_t: Option<f64>,
    pub inflow_tph: Option<f64>,
    pub outflow_tph: Option<f64>,
    pub harvest_tph: f64,
    pub mill_tph: f64,
    pub trucks_en_route: i32,
}

impl From<&OperationalSnapshot> for NewSnapshotRow {
    fn from(s: &OperationalSnapshot) -> Self {
        Self {
            recorded_at: s.timestamp,
            yard_stock_t: s.yard_stock.value(),
            yard_stock_physical_t: s.yard_stock_physical.map(|t| t.value()),
            inflow_tph: s.inflow_rate_tph,
            outflow_tph: s.outflow_rate_tph,
            harvest_tph: s.harvest_rate_tph,
            mill_tph: s.mill_rate_tph,
            trucks_en_route: s.trucks_en_route.min(i32::MAX as u32) as i32,
        }
    }
}

impl From<SnapshotRow> for OperationalSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            timestamp: row.recorded_at,
            yard_stock: Tonnes::new(row.yard_stock_t),
            yard_stock_physical: row.yard_stock_physical_t.map(Tonnes::new),
            inflow_rate_tph: row.inflow_tph,
            outflow_rate_tph: row.outflow_tph,
            harvest_rate_tph: row.harvest_tph,
            mill_rate_tph: row.mill_tph,
            trucks_en_route: row.trucks_en_route.max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = hourly_patterns)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatternRow {
    pub hour_of_day: i16,
    pub weekday: i16,
    pub harvest_tph_mean: f64,
    pub mill_tph_mean: f64,
    pub truck_arrivals_mean: f64,
    pub speed_kmh_mean: f64,
    pub harvest_tph_stddev: f64,
    pub mill_tph_stddev: f64,
    pub truck_arrivals_stddev: f64,
    pub speed_kmh_stddev: f64,
    pub sample_count: i32,
    pub updated_at: DateTime<Utc>,
}

impl PatternRow {
    pub fn from_pattern(p: &HourlyPattern, updated_at: DateTime<Utc>) -> Self {
        Self {
            hour_of_day: p.hour_of_day as i16,
            weekday: p.weekday as i16,
            harvest_tph_mean: p.harvest_rate_mean,
            mill_tph_mean: p.mill_rate_mean,
            truck_arrivals_mean: p.truck_arrivals_mean,
            speed_kmh_mean: p.speed_mean_kmh,
            harvest_tph_stddev: p.harvest_rate_stddev,
            mill_tph_stddev: p.mill_rate_stddev,
            truck_arrivals_stddev: p.truck_arrivals_stddev,
            speed_kmh_stddev: p.speed_stddev_kmh,
            sample_count: p.sample_count.min(i32::MAX as u32) as i32,
            updated_at,
        }
    }
}

impl From<PatternRow> for HourlyPattern {
    fn from(row: PatternRow) -> Self {
        Self {
            hour_of_day: row.hour_of_day as u8,
            weekday: row.weekday as u8,
            harvest_rate_mean: row.harvest_tph_mean,
            mill_rate_mean: row.mill_tph_mean,
            truck_arrivals_mean: row.truck_arrivals_mean,
            speed_mean_kmh: row.speed_kmh_mean,
            harvest_rate_stddev: row.harvest_tph_stddev,
            mill_rate_stddev: row.mill_tph_stddev,
            truck_arrivals_stddev: row.truck_arrivals_stddev,
            speed_stddev_kmh: row.speed_kmh_stddev,
            sample_count: row.sample_count.max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = operational_limits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LimitRow {
    pub variable: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub critical_lower: f64,
    pub critical_upper: f64,
    pub unit: String,
    pub description: String,
}

impl From<&OperationalLimit> for LimitRow {
    fn from(l: &OperationalLimit) -> Self {
        Self {
            variable: l.variable.clone(),
            lower_bound: l.lower,
            upper_bound: l.upper,
            critical_lower: l.critical_lower,
            critical_upper: l.critical_upper,
            unit: l.unit.clone(),
            description: l.description.clone(),
        }
    }
}

impl From<LimitRow> for OperationalLimit {
    fn from(row: LimitRow) -> Self {
        Self {
            variable: row.variable,
            lower: row.lower_bound,
            upper: row.upper_bound,
            critical_lower: row.critical_lower,
            critical_upper: row.critical_upper,
            unit: row.unit,
            description: row.description,
        }
    }
}

/// One horizon of a stored forecast run.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = forecast_points)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ForecastPointRow {
    pub generated_at: DateTime<Utc>,
    pub horizon: i32,
    pub model_version: String,
    pub projected_at: DateTime<Utc>,
    pub projected_stock_t: f64,
    pub projected_inflow_tph: f64,
    pub projected_outflow_tph: f64,
    pub lower_bound_t: f64,
    pub upper_bound_t: f64,
    pub confidence: f64,
    pub root_cause: Option<String>,
    pub root_cause_magnitude: Option<f64>,
    pub within_limits: bool,
}

impl ForecastPointRow {
    pub fn new(generated_at: DateTime<Utc>, model_version: &str, p: &ForecastPoint) -> Self {
        Self {
            generated_at,
            horizon: p.horizon as i32,
            model_version: model_version.to_string(),
            projected_at: p.timestamp,
            projected_stock_t: p.projected_stock.value(),
            projected_inflow_tph: p.projected_inflow,
            projected_outflow_tph: p.projected_outflow,
            lower_bound_t: p.lower_bound.value(),
            upper_bound_t: p.upper_bound.value(),
            confidence: p.confidence,
            root_cause: p.root_cause.map(|c| c.as_str().to_string()),
            root_cause_magnitude: p.root_cause_magnitude,
            within_limits: p.within_limits,
        }
    }

    pub fn into_point(self) -> RepositoryResult<ForecastPoint> {
        let root_cause = self
            .root_cause
            .as_deref()
            .map(str::parse::<RootCause>)
            .transpose()
            .map_err(RepositoryError::internal)?;

        Ok(ForecastPoint {
            horizon: self.horizon.max(0) as u32,
            timestamp: self.projected_at,
            projected_stock: Tonnes::new(self.projected_stock_t),
            projected_inflow: self.projected_inflow_tph,
            projected_outflow: self.projected_outflow_tph,
            lower_bound: Tonnes::new(self.lower_bound_t),
            upper_bound: Tonnes::new(self.upper_bound_t),
            confidence: self.confidence,
            root_cause,
            root_cause_magnitude: self.root_cause_magnitude,
            within_limits: self.within_limits,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = forecast_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct EventRow {
    pub event_id: i64,
    pub generated_at: DateTime<Utc>,
    pub horizon: i32,
    pub projected_at: DateTime<Utc>,
    pub variable: String,
    pub projected_value: f64,
    pub limit_breached: f64,
    pub root_cause: String,
    pub root_cause_magnitude: f64,
    pub severity: String,
    pub description: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = forecast_events)]
pub struct NewEventRow {
    pub generated_at: DateTime<Utc>,
    pub horizon: i32,
    pub projected_at: DateTime<Utc>,
    pub variable: String,
    pub projected_value: f64,
    pub limit_breached: f64,
    pub root_cause: String,
    pub root_cause_magnitude: f64,
    pub severity: String,
    pub description: String,
}

impl From<&ForecastEvent> for NewEventRow {
    fn from(e: &ForecastEvent) -> Self {
        Self {
            generated_at: e.generated_at,
            horizon: e.horizon as i32,
            projected_at: e.projected_at,
            variable: e.variable.clone(),
            projected_value: e.projected_value,
            limit_breached: e.limit_breached,
            root_cause: e.root_cause.as_str().to_string(),
            root_cause_magnitude: e.root_cause_magnitude,
            severity: e.severity.as_str().to_string(),
            description: e.description.clone(),
        }
    }
}

impl TryFrom<EventRow> for ForecastEvent {
    type Error = RepositoryError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            generated_at: row.generated_at,
            horizon: row.horizon.max(0) as u32,
            projected_at: row.projected_at,
            variable: row.variable,
            projected_value: row.projected_value,
            limit_breached: row.limit_breached,
            root_cause: row.root_cause.parse().map_err(RepositoryError::internal)?,
            root_cause_magnitude: row.root_cause_magnitude,
            severity: row
                .severity
                .parse::<EventSeverity>()
                .map_err(RepositoryError::internal)?,
            description: row.description,
        })
    }
}
