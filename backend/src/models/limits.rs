//! Operational limit bands for monitored variables.

use serde::{Deserialize, Serialize};

pub const YARD_STOCK_VARIABLE: &str = "yard_stock_tons";
pub const TRUCK_ARRIVALS_VARIABLE: &str = "truck_arrivals_per_hour";
pub const MILL_RATE_VARIABLE: &str = "mill_rate_tph";

/// Normal band `[lower, upper]` nested inside a critical band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalLimit {
    pub variable: String,
    pub lower: f64,
    pub upper: f64,
    pub critical_lower: f64,
    pub critical_upper: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

impl OperationalLimit {
    /// Build a limit row, rejecting inconsistent bands.
    pub fn new(
        variable: impl Into<String>,
        lower: f64,
        upper: f64,
        critical_lower: f64,
        critical_upper: f64,
    ) -> Result<Self, String> {
        let limit = Self {
            variable: variable.into(),
            lower,
            upper,
            critical_lower,
            critical_upper,
            unit: String::new(),
            description: String::new(),
        };
        limit.validate()?;
        Ok(limit)
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.variable.trim().is_empty() {
            return Err("variable name must not be empty".to_string());
        }
        let all = [self.lower, self.upper, self.critical_lower, self.critical_upper];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(format!("limits for '{}' must be finite", self.variable));
        }
        if self.lower >= self.upper {
            return Err(format!(
                "lower ({}) must be below upper ({}) for '{}'",
                self.lower, self.upper, self.variable
            ));
        }
        if self.critical_lower > self.lower || self.upper > self.critical_upper {
            return Err(format!(
                "critical band [{}, {}] must contain normal band [{}, {}] for '{}'",
                self.critical_lower, self.critical_upper, self.lower, self.upper, self.variable
            ));
        }
        Ok(())
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn within_critical(&self, value: f64) -> bool {
        self.critical_lower <= value && value <= self.critical_upper
    }

    pub fn default_yard_stock() -> Self {
        Self {
            variable: YARD_STOCK_VARIABLE.to_string(),
            lower: 800.0,
            upper: 1500.0,
            critical_lower: 600.0,
            critical_upper: 1800.0,
            unit: "t".to_string(),
            description: "Logical yard stock".to_string(),
        }
    }

    /// The rows seeded into an empty limits table.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::default_yard_stock(),
            Self {
                variable: TRUCK_ARRIVALS_VARIABLE.to_string(),
                lower: 15.0,
                upper: 35.0,
                critical_lower: 10.0,
                critical_upper: 40.0,
                unit: "trucks/h".to_string(),
                description: "Truck arrivals at the yard gate".to_string(),
            },
            Self {
                variable: MILL_RATE_VARIABLE.to_string(),
                lower: 800.0,
                upper: 1100.0,
                critical_lower: 700.0,
                critical_upper: 1150.0,
                unit: "t/h".to_string(),
                description: "Mill crushing rate".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_inverted_band() {
        assert!(OperationalLimit::new("x", 10.0, 5.0, 0.0, 20.0).is_err());
        assert!(OperationalLimit::new("x", 5.0, 5.0, 0.0, 20.0).is_err());
    }

    #[test]
    fn test_new_rejects_critical_inside_normal() {
        assert!(OperationalLimit::new("x", 5.0, 10.0, 6.0, 20.0).is_err());
        assert!(OperationalLimit::new("x", 5.0, 10.0, 0.0, 9.0).is_err());
        assert!(OperationalLimit::new("x", 5.0, 10.0, 5.0, 10.0).is_ok());
    }

    #[test]
    fn test_defaults_are_valid() {
        for limit in OperationalLimit::defaults() {
            assert!(limit.validate().is_ok(), "{}", limit.variable);
        }
        let yard = OperationalLimit::default_yard_stock();
        assert!(yard.contains(800.0));
        assert!(yard.contains(1500.0));
        assert!(!yard.contains(1500.1));
        assert!(yard.within_critical(1700.0));
        assert!(!yard.within_critical(1801.0));
    }
}
