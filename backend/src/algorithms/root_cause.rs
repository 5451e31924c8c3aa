//! Root-cause attribution for projected limit breaches.
//!
//! Attribution is an ordered decision table: rules are evaluated top to
//! bottom and the first rule whose side and predicate match wins. Each side
//! ends with an unconditional "gradual" rule, so any out-of-band stock gets
//! exactly one label.

use serde::{Deserialize, Serialize};

use crate::models::RootCause;

/// Rate thresholds used by the decision table, in t/h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootCauseThresholds {
    pub high_inflow: f64,
    pub low_outflow: f64,
    pub low_inflow: f64,
    pub high_outflow: f64,
    pub high_harvest: f64,
}

impl Default for RootCauseThresholds {
    fn default() -> Self {
        Self {
            high_inflow: 60.0,
            low_outflow: 80.0,
            low_inflow: 40.0,
            high_outflow: 100.0,
            high_harvest: 75.0,
        }
    }
}

/// Which side of the normal band the stock fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachSide {
    Above,
    Below,
}

/// Projected quantities for one breaching horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributionInput {
    pub stock: f64,
    pub inflow: f64,
    pub outflow: f64,
    pub harvest: f64,
    pub lower: f64,
    pub upper: f64,
}

impl AttributionInput {
    pub fn side(&self) -> Option<BreachSide> {
        if self.stock > self.upper {
            Some(BreachSide::Above)
        } else if self.stock < self.lower {
            Some(BreachSide::Below)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attribution {
    pub root_cause: RootCause,
    /// The rate (or stock, for gradual causes) that triggered the rule
    pub magnitude: f64,
}

pub struct Rule {
    pub side: BreachSide,
    pub root_cause: RootCause,
    pub applies: fn(&AttributionInput, &RootCauseThresholds) -> bool,
    pub magnitude: fn(&AttributionInput) -> f64,
}

fn always(_: &AttributionInput, _: &RootCauseThresholds) -> bool {
    true
}

fn harvest_driven(i: &AttributionInput, t: &RootCauseThresholds) -> bool {
    i.inflow > t.high_inflow && i.harvest > t.high_harvest
}

fn inflow_high(i: &AttributionInput, t: &RootCauseThresholds) -> bool {
    i.inflow > t.high_inflow
}

fn outflow_low(i: &AttributionInput, t: &RootCauseThresholds) -> bool {
    i.outflow < t.low_outflow
}

fn inflow_low(i: &AttributionInput, t: &RootCauseThresholds) -> bool {
    i.inflow < t.low_inflow
}

fn outflow_high(i: &AttributionInput, t: &RootCauseThresholds) -> bool {
    i.outflow > t.high_outflow
}

fn harvest(i: &AttributionInput) -> f64 {
    i.harvest
}

fn inflow(i: &AttributionInput) -> f64 {
    i.inflow
}

fn outflow(i: &AttributionInput) -> f64 {
    i.outflow
}

fn stock(i: &AttributionInput) -> f64 {
    i.stock
}

/// Evaluation order of the decision table.
pub const RULES: [Rule; 7] = [
    Rule {
        side: BreachSide::Above,
        root_cause: RootCause::HighHarvest,
        applies: harvest_driven,
        magnitude: harvest,
    },
    Rule {
        side: BreachSide::Above,
        root_cause: RootCause::ExcessiveArrivals,
        applies: inflow_high,
        magnitude: inflow,
    },
    Rule {
        side: BreachSide::Above,
        root_cause: RootCause::LowMilling,
        applies: outflow_low,
        magnitude: outflow,
    },
    Rule {
        side: BreachSide::Above,
        root_cause: RootCause::GradualAccumulation,
        applies: always,
        magnitude: stock,
    },
    Rule {
        side: BreachSide::Below,
        root_cause: RootCause::FewArrivals,
        applies: inflow_low,
        magnitude: inflow,
    },
    Rule {
        side: BreachSide::Below,
        root_cause: RootCause::HighMilling,
        applies: outflow_high,
        magnitude: outflow,
    },
    Rule {
        side: BreachSide::Below,
        root_cause: RootCause::GradualDepletion,
        applies: always,
        magnitude: stock,
    },
];

/// Attribute a breach; `None` when the stock lies within `[lower, upper]`.
pub fn attribute(input: &AttributionInput, thresholds: &RootCauseThresholds) -> Option<Attribution> {
    let side = input.side()?;
    RULES
        .iter()
        .filter(|rule| rule.side == side)
        .find(|rule| (rule.applies)(input, thresholds))
        .map(|rule| Attribution {
            root_cause: rule.root_cause,
            magnitude: (rule.magnitude)(input),
        })
}
