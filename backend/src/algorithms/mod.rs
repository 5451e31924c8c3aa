//! Pure forecasting algorithms.
//!
//! Nothing in this module touches a repository or the clock; services feed
//! it resolved inputs and persist what it returns.

pub mod blending;
pub mod confidence;
pub mod projection;
pub mod root_cause;
pub mod tendency;
pub mod trend;

pub use blending::{blend, blend_weights, BlendWeights};
pub use confidence::{uncertainty_band, ConfidenceSchedule, UncertaintyBand};
pub use projection::{classify, project_horizons, ProjectionInput, ProjectionState};
pub use root_cause::{attribute, Attribution, AttributionInput, BreachSide, RootCauseThresholds};
pub use tendency::{
    imbalance_alerts, recommendations, stock_tendency, AlertLevel, OperationalAlert,
    Recommendation, RecommendationKind, StockTendency,
};
pub use trend::{endpoint_trend, Trend};
