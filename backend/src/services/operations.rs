//! Live yard summary for the operations dashboard.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Serialize;

use crate::algorithms::{
    imbalance_alerts, recommendations, stock_tendency, OperationalAlert, Recommendation,
    StockTendency,
};
use crate::db::{FullRepository, RepositoryResult};
use crate::models::{OperationalLimit, OperationalSnapshot, YARD_STOCK_VARIABLE};

/// Window over which the live stock tendency is judged.
pub const TENDENCY_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct OperationalSummary {
    pub snapshot: OperationalSnapshot,
    pub physical_stock_tons: f64,
    pub balance_tph: f64,
    pub tendency: StockTendency,
    pub alerts: Vec<OperationalAlert>,
    pub recommendations: Vec<Recommendation>,
}

/// Summary of the latest snapshot, `None` before the first sample arrives.
///
/// `offset` is the mill's local clock, used for the time-of-day advice.
pub async fn operational_summary<R: FullRepository + ?Sized>(
    repo: &R,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> RepositoryResult<Option<OperationalSummary>> {
    let Some(snapshot) = repo.latest_snapshot().await? else {
        return Ok(None);
    };
    let window = repo
        .snapshots_since(now - chrono::Duration::minutes(TENDENCY_WINDOW_MINUTES))
        .await?;
    let limit = repo
        .limits_for(YARD_STOCK_VARIABLE)
        .await?
        .unwrap_or_else(OperationalLimit::default_yard_stock);

    let tendency = stock_tendency(&window);
    let local_hour = now.with_timezone(&offset).hour();

    Ok(Some(OperationalSummary {
        physical_stock_tons: snapshot.physical_stock().value(),
        balance_tph: snapshot.balance(),
        tendency,
        alerts: imbalance_alerts(&snapshot),
        recommendations: recommendations(&snapshot, tendency, &limit, local_hour),
        snapshot,
    }))
}
