//! Data Transfer Objects for the HTTP API.
//!
//! Domain records are serialized as they are; these types only wrap them
//! with request parameters and response metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::{Attribution, Trend};
use crate::models::{ForecastEvent, ForecastRun, OperationalLimit, OperationalSnapshot};
use crate::services::{ForecastOutcome, ForecastWarning};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// `?horizon=N` on `POST /v1/forecast`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastQuery {
    #[serde(default)]
    pub horizon: Option<u32>,
}

/// `?limit=N` on the listing endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 500;

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// `?hours=N` on `GET /v1/snapshots`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub hours: Option<u32>,
}

impl HistoryQuery {
    pub const DEFAULT_HOURS: u32 = 24;
    /// One hour up to one week.
    pub const HOURS_RANGE: std::ops::RangeInclusive<u32> = 1..=168;

    pub fn hours(&self) -> u32 {
        self.hours.unwrap_or(Self::DEFAULT_HOURS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub hours: u32,
    pub since: DateTime<Utc>,
    pub snapshots: Vec<OperationalSnapshot>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

/// Response for an on-demand forecast.
///
/// The run is returned in full even when it could not be stored; then
/// `persisted` is false and `persistence_error` says why.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResponse {
    pub run: ForecastRun,
    pub current: OperationalSnapshot,
    pub limit: OperationalLimit,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_assessment: Option<Attribution>,
    pub events: Vec<ForecastEvent>,
    pub warnings: Vec<ForecastWarning>,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

impl From<ForecastOutcome> for ForecastResponse {
    fn from(outcome: ForecastOutcome) -> Self {
        Self {
            persisted: outcome.persistence.is_ok(),
            persistence_error: outcome.persistence.err().map(|e| e.to_string()),
            run: outcome.run,
            current: outcome.current,
            limit: outcome.limit,
            trend: outcome.trend,
            live_assessment: outcome.live_assessment,
            events: outcome.events,
            warnings: outcome.warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRunsResponse {
    pub generations: Vec<DateTime<Utc>>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<ForecastEvent>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsResponse {
    pub limits: Vec<OperationalLimit>,
}
