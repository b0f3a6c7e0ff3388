//! Saleable area and price-per-area (APR) derivation.

use crate::units::round3;

/// Default ratio of saleable to carpet area
pub const DEFAULT_LOADING_FACTOR: f64 = 1.35;

/// Carpet area inflated by the common-area loading, rounded to 3 decimals
pub fn saleable_area(carpet_sqft: f64, loading_factor: f64) -> f64 {
    round3(carpet_sqft * loading_factor)
}

/// Consideration per square foot of saleable area
///
/// A non-positive saleable area yields `0.0` rather than an error.
///
/// ```rust
/// use realty_extract::rate::rate;
///
/// assert_eq!(rate(9_000_000.0, 0.0), 0.0);
/// assert_eq!(rate(9_000_000.0, 1000.0), 9000.0);
/// ```
pub fn rate(consideration: f64, saleable_sqft: f64) -> f64 {
    if saleable_sqft > 0.0 {
        round3(consideration / saleable_sqft)
    } else {
        0.0
    }
}
