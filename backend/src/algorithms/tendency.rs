//! Short-term stock tendency, harvest/mill imbalance alerts and the
//! dispatch recommendations derived from them.

use serde::{Deserialize, Serialize};

use crate::models::{OperationalLimit, OperationalSnapshot};

/// Stock change over the tendency window that counts as movement, in tons.
pub const TENDENCY_THRESHOLD_TONS: f64 = 100.0;
pub const IMBALANCE_ATTENTION_TPH: f64 = 50.0;
pub const IMBALANCE_CRITICAL_TPH: f64 = 100.0;
pub const LOW_HARVEST_TPH: f64 = 35.0;
/// Harvest/mill gap that calls for adjusting one side, in t/h.
pub const RECOMMENDATION_GAP_TPH: f64 = 30.0;
/// Local hours (inclusive) of the afternoon traffic peak.
pub const AFTERNOON_PEAK_HOURS: (u32, u32) = (13, 16);
/// Local hours (inclusive) of the morning window.
pub const MORNING_WINDOW_HOURS: (u32, u32) = (6, 9);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTendency {
    Rising,
    Falling,
    Stable,
}

/// Tendency between the earliest and latest sample of `window`.
pub fn stock_tendency(window: &[OperationalSnapshot]) -> StockTendency {
    let first = window.iter().min_by_key(|s| s.timestamp);
    let last = window.iter().max_by_key(|s| s.timestamp);
    match (first, last) {
        (Some(first), Some(last)) if window.len() >= 2 => {
            let delta = last.yard_stock.value() - first.yard_stock.value();
            if delta > TENDENCY_THRESHOLD_TONS {
                StockTendency::Rising
            } else if delta < -TENDENCY_THRESHOLD_TONS {
                StockTendency::Falling
            } else {
                StockTendency::Stable
            }
        }
        _ => StockTendency::Stable,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Attention,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalAlert {
    pub level: AlertLevel,
    pub message: String,
}

/// Alerts for the live harvest/mill balance.
pub fn imbalance_alerts(snapshot: &OperationalSnapshot) -> Vec<OperationalAlert> {
    let mut alerts = Vec::new();
    let gap = snapshot.harvest_rate_tph - snapshot.mill_rate_tph;

    if gap.abs() > IMBALANCE_CRITICAL_TPH {
        alerts.push(OperationalAlert {
            level: AlertLevel::Critical,
            message: format!("harvest/mill imbalance of {:.0} t/h", gap),
        });
    } else if gap.abs() > IMBALANCE_ATTENTION_TPH {
        alerts.push(OperationalAlert {
            level: AlertLevel::Attention,
            message: format!("harvest/mill imbalance of {:.0} t/h", gap),
        });
    }

    if snapshot.harvest_rate_tph < LOW_HARVEST_TPH {
        alerts.push(OperationalAlert {
            level: AlertLevel::Attention,
            message: format!("harvest rate low at {:.0} t/h", snapshot.harvest_rate_tph),
        });
    }

    alerts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    DispatchDistantFarms,
    NearbyFarmsOnly,
    RaiseMillRate,
    OpenHarvestFronts,
    AfternoonPeak,
    MorningWindow,
}

impl RecommendationKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::DispatchDistantFarms => {
                "Yard is high and rising: dispatch trucks to distant farms, longer cycles are affordable"
            }
            Self::NearbyFarmsOnly => {
                "Yard is low and falling: prioritise nearby farms and short cycles"
            }
            Self::RaiseMillRate => "Harvest outpaces milling: consider raising the mill rate",
            Self::OpenHarvestFronts => {
                "Milling outpaces harvest: check for additional harvest fronts"
            }
            Self::AfternoonPeak => "Afternoon peak: avoid dispatching to distant farms",
            Self::MorningWindow => "Morning window: good time to rebalance the fleet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

impl From<RecommendationKind> for Recommendation {
    fn from(kind: RecommendationKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }
}

/// Dispatch advice for the live state, at most one per concern: stock level
/// against `limit`, harvest/mill balance, then time of day (`local_hour`).
pub fn recommendations(
    snapshot: &OperationalSnapshot,
    tendency: StockTendency,
    limit: &OperationalLimit,
    local_hour: u32,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let stock = snapshot.yard_stock.value();

    if stock > limit.upper && tendency == StockTendency::Rising {
        out.push(RecommendationKind::DispatchDistantFarms);
    } else if stock < limit.lower && tendency == StockTendency::Falling {
        out.push(RecommendationKind::NearbyFarmsOnly);
    }

    let harvest = snapshot.harvest_rate_tph;
    let mill = snapshot.mill_rate_tph;
    if harvest > mill + RECOMMENDATION_GAP_TPH {
        out.push(RecommendationKind::RaiseMillRate);
    } else if mill > harvest + RECOMMENDATION_GAP_TPH {
        out.push(RecommendationKind::OpenHarvestFronts);
    }

    let in_window = |(start, end): (u32, u32)| (start..=end).contains(&local_hour);
    if in_window(AFTERNOON_PEAK_HOURS) {
        out.push(RecommendationKind::AfternoonPeak);
    } else if in_window(MORNING_WINDOW_HOURS) {
        out.push(RecommendationKind::MorningWindow);
    }

    out.into_iter().map(Recommendation::from).collect()
}
