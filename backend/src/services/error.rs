//! Forecast errors and non-fatal warnings.

use serde::Serialize;

use crate::db::RepositoryError;
use crate::models::PatternSource;

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// The time series is empty; the system has not warmed up yet.
    #[error("no operational snapshot available yet")]
    NoData,

    #[error("horizon {requested} is outside 1..={max}")]
    InvalidHorizon { requested: u32, max: u32 },

    /// Reading the current state failed for a reason other than absence.
    #[error("store error while reading current state: {0}")]
    Store(#[from] RepositoryError),
}

impl ForecastError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, ForecastError::NoData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStage {
    ForecastRun,
    Events,
}

impl std::fmt::Display for PersistenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceStage::ForecastRun => f.write_str("forecast run"),
            PersistenceStage::Events => f.write_str("breach events"),
        }
    }
}

/// A computed forecast could not be made durable.
///
/// The forecast itself is still returned to the caller alongside this error.
#[derive(Debug, thiserror::Error)]
#[error("failed to persist {stage}: {source}")]
pub struct PersistenceError {
    pub stage: PersistenceStage,
    #[source]
    pub source: RepositoryError,
}

impl PersistenceError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Conditions that degraded a forecast without stopping it.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastWarning {
    #[error("no exact pattern for hour {hour_of_day} weekday {weekday}; used {tier}")]
    PatternFallback {
        hour_of_day: u8,
        weekday: u8,
        tier: PatternSource,
    },

    #[error("only {samples} samples in trend window; assuming flat trend")]
    FlatTrend { samples: usize },

    #[error("no limits configured for {variable}; using defaults")]
    DefaultLimits { variable: String },

    #[error("{operation} failed: {message}")]
    StoreReadFailed { operation: String, message: String },
}

impl ForecastWarning {
    pub(crate) fn store_read(operation: &str, err: &RepositoryError) -> Self {
        ForecastWarning::StoreReadFailed {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Log and return `self`.
    pub(crate) fn logged(self) -> Self {
        log::warn!("{}", self);
        self
    }
}
