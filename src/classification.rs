//! Bedroom-configuration classification by carpet-area bands.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bedroom configuration inferred from carpet area
///
/// Variants are declared in band order so sorting by configuration follows area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Configuration {
    #[serde(rename = "1BHK")]
    OneBhk,
    #[serde(rename = "2BHK")]
    TwoBhk,
    #[serde(rename = "3BHK")]
    ThreeBhk,
    #[serde(rename = "4BHK")]
    FourBhk,
    #[serde(rename = "unresolved")]
    Unresolved,
}

impl Configuration {
    pub fn label(self) -> &'static str {
        match self {
            Configuration::OneBhk => "1BHK",
            Configuration::TwoBhk => "2BHK",
            Configuration::ThreeBhk => "3BHK",
            Configuration::FourBhk => "4BHK",
            Configuration::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Square-foot boundaries between the four configuration bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationThresholds {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
}

impl Default for ConfigurationThresholds {
    fn default() -> Self {
        Self {
            t1: 600.0,
            t2: 850.0,
            t3: 1100.0,
        }
    }
}

impl ConfigurationThresholds {
    /// Thresholds must be finite, positive and strictly increasing
    pub fn validate(&self) -> AppResult<()> {
        if ![self.t1, self.t2, self.t3].iter().all(|t| t.is_finite() && *t > 0.0) {
            return Err(AppError::Config(format!(
                "Configuration thresholds must be positive numbers, got {}/{}/{}",
                self.t1, self.t2, self.t3
            )));
        }
        if !(self.t1 < self.t2 && self.t2 < self.t3) {
            return Err(AppError::Config(format!(
                "Configuration thresholds must be strictly increasing, got {}/{}/{}",
                self.t1, self.t2, self.t3
            )));
        }
        Ok(())
    }
}

/// Map a square-foot carpet area to its configuration band
///
/// Precondition: `t1 < t2 < t3` (see [`ConfigurationThresholds::validate`]).
///
/// ```rust
/// use realty_extract::classification::{classify, Configuration, ConfigurationThresholds};
///
/// let bands = ConfigurationThresholds::default();
/// assert_eq!(classify(0.0, &bands), Configuration::Unresolved);
/// assert_eq!(classify(599.9, &bands), Configuration::OneBhk);
/// assert_eq!(classify(600.0, &bands), Configuration::TwoBhk);
/// assert_eq!(classify(1100.0, &bands), Configuration::FourBhk);
/// ```
pub fn classify(area_sqft: f64, thresholds: &ConfigurationThresholds) -> Configuration {
    if area_sqft <= 0.0 {
        Configuration::Unresolved
    } else if area_sqft < thresholds.t1 {
        Configuration::OneBhk
    } else if area_sqft < thresholds.t2 {
        Configuration::TwoBhk
    } else if area_sqft < thresholds.t3 {
        Configuration::ThreeBhk
    } else {
        Configuration::FourBhk
    }
}
