//! Area unit conversion.
//!
//! Conversions are exact arithmetic with no rounding; callers round once at the
//! end of their pipeline with [`round3`].

/// Square feet per square metre
pub const SQFT_PER_SQMT: f64 = 10.764;

/// Convert square metres to square feet
pub fn metric_to_imperial(square_metres: f64) -> f64 {
    square_metres * SQFT_PER_SQMT
}

/// Convert square feet to square metres
pub fn imperial_to_metric(square_feet: f64) -> f64 {
    square_feet / SQFT_PER_SQMT
}

/// Round to 3 decimal digits
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
