//! Live operational state of the mill yard.

use chrono::{DateTime, Utc};
use qtty::Tonnes;
use serde::{Deserialize, Serialize};

/// Share of the logical yard stock assumed to be physically unloaded when the
/// feed does not report a physical figure.
pub const PHYSICAL_STOCK_RATIO: f64 = 0.7;

/// Immutable record of the yard state at one instant.
///
/// Produced by the upstream data feed and consumed read-only by the forecast
/// engine. The yard inflow, outflow and physical stock may be missing from a
/// sample; use the accessor methods, which apply the feed's fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Logical yard stock (tons assigned to the yard, including trucks queued at the gate)
    pub yard_stock: Tonnes,
    /// Stock physically unloaded on the yard floor
    #[serde(default)]
    pub yard_stock_physical: Option<Tonnes>,
    /// Tons per hour entering the yard
    #[serde(default)]
    pub inflow_rate_tph: Option<f64>,
    /// Tons per hour leaving the yard towards the mill
    #[serde(default)]
    pub outflow_rate_tph: Option<f64>,
    pub harvest_rate_tph: f64,
    pub mill_rate_tph: f64,
    #[serde(default)]
    pub trucks_en_route: u32,
}

impl OperationalSnapshot {
    /// Yard inflow, zero when the feed did not report one.
    pub fn inflow(&self) -> f64 {
        self.inflow_rate_tph.unwrap_or(0.0)
    }

    /// Yard outflow, falling back to the mill rate.
    pub fn outflow(&self) -> f64 {
        self.outflow_rate_tph.unwrap_or(self.mill_rate_tph)
    }

    /// Physical yard stock, estimated from the logical stock when missing.
    pub fn physical_stock(&self) -> Tonnes {
        self.yard_stock_physical
            .unwrap_or_else(|| Tonnes::new(self.yard_stock.value() * PHYSICAL_STOCK_RATIO))
    }

    /// Net yard balance in tons per hour.
    pub fn balance(&self) -> f64 {
        self.inflow() - self.outflow()
    }

    /// Check that the sample is physically plausible.
    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("harvest_rate_tph", Some(self.harvest_rate_tph)),
            ("mill_rate_tph", Some(self.mill_rate_tph)),
            ("inflow_rate_tph", self.inflow_rate_tph),
            ("outflow_rate_tph", self.outflow_rate_tph),
        ];
        for (name, value) in rates {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!("{} must be a non-negative number, got {}", name, v));
                }
            }
        }

        let stock = self.yard_stock.value();
        if !stock.is_finite() || stock < 0.0 {
            return Err(format!("yard_stock must be non-negative, got {}", stock));
        }
        if let Some(physical) = self.yard_stock_physical {
            if !physical.value().is_finite() || physical.value() < 0.0 {
                return Err(format!(
                    "yard_stock_physical must be non-negative, got {}",
                    physical.value()
                ));
            }
        }
        Ok(())
    }
}
