//! Project-wide rate configuration.
//!
//! Settings are persisted inside the project database file and threaded
//! into every calculator as an explicit parameter. Nothing in the core
//! reads them ambiently, which keeps the calculators testable in isolation.

use serde::{Deserialize, Serialize};

/// Rate configuration applied to every calculation in a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Billing rate in `currency` per hour.
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
    /// Conversion from verified units to hours. Treated as 1.0 when absent.
    #[serde(default = "default_unit_to_hour_ratio")]
    pub unit_to_hour_ratio: f64,
    /// ISO currency code used for display only.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hourly_rate: default_hourly_rate(),
            unit_to_hour_ratio: default_unit_to_hour_ratio(),
            currency: default_currency(),
        }
    }
}

fn default_hourly_rate() -> f64 {
    100.0
}

fn default_unit_to_hour_ratio() -> f64 {
    1.0
}

fn default_currency() -> String {
    "USD".to_string()
}
