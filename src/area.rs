//! # Area Resolution
//!
//! Reduces the quantities found in a description to one carpet area per record.
//!
//! ## Decision order (per unit system, metric first)
//!
//! ```text
//! quantities survive filtering?
//!   ├─ explicit "total area: N <unit>" present      → N
//!   ├─ 2+ quantities, last ≈ sum(others) (±1.0)     → last
//!   └─ otherwise                                    → sum(all)
//! no metric quantities → repeat with square feet
//! nothing in either    → unresolved (0)
//! ```
//!
//! The total-vs-itemized heuristics never mix unit systems.

use crate::measurement_patterns::AreaUnit;
use crate::text_processing::{normalize_text, AreaDetector};
use crate::units::{imperial_to_metric, metric_to_imperial, round3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum gap between the last quantity and the sum of the others for the
/// last one to be read as a precomputed subtotal
pub const SUBTOTAL_TOLERANCE: f64 = 1.0;

/// Carpet area in the unit system it was written in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedArea {
    /// Area rounded to 3 decimals, in `unit`; zero when unresolved
    pub value: f64,
    /// Unit system the value was read in
    pub unit: AreaUnit,
}

impl ResolvedArea {
    /// Sentinel for descriptions without a usable quantity
    pub const UNRESOLVED: ResolvedArea = ResolvedArea {
        value: 0.0,
        unit: AreaUnit::SquareMetre,
    };

    pub fn is_resolved(&self) -> bool {
        self.value > 0.0
    }

    /// Area in square metres, converting at most once
    pub fn square_metres(&self) -> f64 {
        match self.unit {
            AreaUnit::SquareMetre => self.value,
            AreaUnit::SquareFoot => round3(imperial_to_metric(self.value)),
        }
    }

    /// Area in square feet, converting at most once
    pub fn square_feet(&self) -> f64 {
        match self.unit {
            AreaUnit::SquareMetre => round3(metric_to_imperial(self.value)),
            AreaUnit::SquareFoot => self.value,
        }
    }
}

/// Which rule produced the resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    DeclaredTotal,
    PrecomputedSubtotal,
    Sum,
    Unresolved,
}

/// Outcome of resolving one description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub area: ResolvedArea,
    pub path: ResolutionPath,
    /// Quantities that survived filtering in the chosen unit system
    pub quantity_count: usize,
}

/// Resolves descriptions to a single carpet area
#[derive(Debug, Clone)]
pub struct AreaResolver {
    detector: AreaDetector,
    preference: Vec<AreaUnit>,
}

impl Default for AreaResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaResolver {
    /// Resolver preferring square metres, then square feet
    pub fn new() -> Self {
        Self::with_preference(AreaUnit::PREFERENCE.to_vec())
    }

    /// Resolver trying unit systems in the given order
    pub fn with_preference(preference: Vec<AreaUnit>) -> Self {
        Self {
            detector: AreaDetector::new(),
            preference,
        }
    }

    /// Resolve `text` to one carpet area
    ///
    /// ```rust
    /// use realty_extract::area::{AreaResolver, ResolutionPath};
    ///
    /// let resolution = AreaResolver::new().resolve("Rooms of 20 sq.mt, 25 sq.mt");
    /// assert_eq!(resolution.area.value, 45.0);
    /// assert_eq!(resolution.path, ResolutionPath::Sum);
    /// ```
    pub fn resolve(&self, text: &str) -> Resolution {
        let normalized = normalize_text(text);

        for &unit in &self.preference {
            let values: Vec<f64> = self
                .detector
                .quantities(&normalized, unit)
                .map(|q| q.value)
                .collect();
            if values.is_empty() {
                continue;
            }

            let (value, path) = match self.detector.declared_total(&normalized, unit) {
                Some(total) => (total, ResolutionPath::DeclaredTotal),
                None => reconcile(&values),
            };

            debug!(
                unit = %unit,
                quantities = ?values,
                value,
                path = ?path,
                "Resolved carpet area"
            );
            return Resolution {
                area: ResolvedArea {
                    value: round3(value),
                    unit,
                },
                path,
                quantity_count: values.len(),
            };
        }

        debug!("No usable area quantity found");
        Resolution {
            area: ResolvedArea::UNRESOLVED,
            path: ResolutionPath::Unresolved,
            quantity_count: 0,
        }
    }
}

/// Pick the precomputed subtotal or fall back to summing every quantity
///
/// `values` must be non-empty.
pub fn reconcile(values: &[f64]) -> (f64, ResolutionPath) {
    if let Some((last, others)) = values.split_last() {
        if !others.is_empty() {
            let others_sum: f64 = others.iter().sum();
            if (last - others_sum).abs() <= SUBTOTAL_TOLERANCE {
                return (*last, ResolutionPath::PrecomputedSubtotal);
            }
        }
    }
    (values.iter().sum(), ResolutionPath::Sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str) -> Resolution {
        AreaResolver::new().resolve(text)
    }

    #[test]
    fn test_single_quantity_is_returned_unchanged() {
        let r = resolve("Flat admeasuring 45.678 sq.mt carpet");
        assert_eq!(r.area.value, 45.678);
        assert_eq!(r.area.unit, AreaUnit::SquareMetre);
        assert_eq!(r.path, ResolutionPath::Sum);
    }

    #[test]
    fn test_parking_never_counts() {
        let r = resolve("10 sq.mt parking, 45 sq.mt total area");
        assert_eq!(r.area.value, 45.0);
    }

    #[test]
    fn test_declared_total_overrides_itemized() {
        let r = resolve("hall 12 sq.mt + bedroom 30 sq.mt, total area: 45 sq.mt");
        assert_eq!(r.area.value, 45.0);
        assert_eq!(r.path, ResolutionPath::DeclaredTotal);
    }

    #[test]
    fn test_precomputed_subtotal() {
        let r = resolve("20 sq.mt, 25 sq.mt, 45 sq.mt");
        assert_eq!(r.area.value, 45.0);
        assert_eq!(r.path, ResolutionPath::PrecomputedSubtotal);
    }

    #[test]
    fn test_subtotal_tolerance() {
        assert_eq!(
            reconcile(&[20.0, 25.0, 45.9]),
            (45.9, ResolutionPath::PrecomputedSubtotal)
        );
        let (sum, path) = reconcile(&[20.0, 25.0, 46.5]);
        assert_eq!(path, ResolutionPath::Sum);
        assert!((sum - 91.5).abs() < 1e-9);
    }

    #[test]
    fn test_plain_sum() {
        let r = resolve("20 sq.mt and 25 sq.mt");
        assert_eq!(r.area.value, 45.0);
        assert_eq!(r.path, ResolutionPath::Sum);
        assert_eq!(r.quantity_count, 2);
    }

    #[test]
    fn test_imperial_fallback() {
        let r = resolve("Carpet 550 sq.ft");
        assert_eq!(r.area.unit, AreaUnit::SquareFoot);
        assert_eq!(r.area.square_feet(), 550.0);
        assert_eq!(r.area.square_metres(), 51.096);
    }

    #[test]
    fn test_metric_wins_over_imperial() {
        let r = resolve("45 sq.mt (484 sq.ft)");
        assert_eq!(r.area.unit, AreaUnit::SquareMetre);
        assert_eq!(r.area.value, 45.0);
        assert_eq!(r.area.square_feet(), 484.38);
    }

    #[test]
    fn test_heuristics_stay_within_one_unit() {
        // Imperial declaration is ignored because metric quantities exist
        let r = resolve("20 sq.mt, 25 sq.mt, total area: 600 sq.ft");
        assert_eq!(r.area.unit, AreaUnit::SquareMetre);
        assert_eq!(r.path, ResolutionPath::Sum);
        assert_eq!(r.area.value, 45.0);
    }

    #[test]
    fn test_unresolved() {
        let r = resolve("3rd floor flat near the station");
        assert!(!r.area.is_resolved());
        assert_eq!(r.area, ResolvedArea::UNRESOLVED);
        assert_eq!(r.path, ResolutionPath::Unresolved);
        assert_eq!(r.area.square_feet(), 0.0);
    }

    #[test]
    fn test_rounding_to_three_decimals() {
        let r = resolve("10.1234 sq.mt, 20.0004 sq.mt and 3 sq.mt");
        assert_eq!(r.area.value, 33.124);
    }
}
