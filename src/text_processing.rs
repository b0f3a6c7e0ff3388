//! # Text Processing Module
//!
//! Regex-based detection of area measurements in free-text property descriptions.
//!
//! ## Features
//!
//! - Whitespace and comma normalization before matching
//! - Square-metre and square-foot detection in Latin and Devanagari scripts
//! - Plausibility bounds that discard floor counts, survey numbers and phone digits
//! - Parking exclusion from the text between quantities and the words right after a unit
//! - Thousands separators in Western grouping (`1,045 sq.ft`)
//! - Detection of explicit "total area" declarations

use crate::measurement_patterns::{self, AreaUnit};
use lazy_static::lazy_static;
use regex::{CaptureMatches, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Number immediately followed (optionally after whitespace) by a unit token;
/// a comma directly between digit groups of three is a thousands separator
const QUANTITY_PATTERN: &str = r"(?P<quantity>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*";

/// Words after a unit token that can mark the quantity as parking (`10 sq.mt car parking`)
const TRAILING_WORDS: usize = 2;

/// Characters that end a clause when looking for parking context
const CLAUSE_SEPARATORS: &[char] = &[',', ';', '|'];

fn quantity_regex(unit: AreaUnit) -> String {
    format!(
        r"(?i){}(?:{})",
        QUANTITY_PATTERN,
        measurement_patterns::alternation(unit.tokens())
    )
}

fn declared_total_regex(unit: AreaUnit) -> String {
    format!(
        r"(?i)(?:{})\s*[:=\-]?\s*{}(?:{})",
        measurement_patterns::alternation(measurement_patterns::keywords_for(
            measurement_patterns::TOTAL_AREA_KEYWORDS,
            None
        )),
        QUANTITY_PATTERN,
        measurement_patterns::alternation(unit.tokens())
    )
}

// Compiled once; the vocabularies are closed so the patterns never change at runtime
lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("Whitespace pattern should be valid");
    static ref SPACE_BEFORE_COMMA: Regex = Regex::new(r" ,").expect("Comma pattern should be valid");
    static ref METRIC_QUANTITY: Regex = Regex::new(&quantity_regex(AreaUnit::SquareMetre))
        .expect("Metric quantity pattern should be valid");
    static ref IMPERIAL_QUANTITY: Regex = Regex::new(&quantity_regex(AreaUnit::SquareFoot))
        .expect("Imperial quantity pattern should be valid");
    static ref METRIC_DECLARED_TOTAL: Regex =
        Regex::new(&declared_total_regex(AreaUnit::SquareMetre))
            .expect("Metric total pattern should be valid");
    static ref IMPERIAL_DECLARED_TOTAL: Regex =
        Regex::new(&declared_total_regex(AreaUnit::SquareFoot))
            .expect("Imperial total pattern should be valid");
    static ref PARKING: Regex = Regex::new(&format!(
        "(?i)(?:{})",
        measurement_patterns::alternation(measurement_patterns::keywords_for(
            measurement_patterns::PARKING_KEYWORDS,
            None
        ))
    ))
    .expect("Parking pattern should be valid");
}

/// A numeric quantity found next to a unit token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedQuantity {
    /// Parsed value in `unit`
    pub value: f64,
    /// Unit system of the token that followed the number
    pub unit: AreaUnit,
    /// Clause of text preceding the number
    pub context: String,
}

/// Collapse whitespace runs to one space and drop spaces before commas
///
/// Space after a comma is kept so that `4, 450` never reads as `4,450`.
///
/// ```rust
/// use realty_extract::text_processing::normalize_text;
///
/// assert_eq!(normalize_text("  20  sq.mt ,\n 25 sq.mt "), "20 sq.mt, 25 sq.mt");
/// ```
pub fn normalize_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    SPACE_BEFORE_COMMA.replace_all(&collapsed, ",").into_owned()
}

/// Parse a matched quantity, dropping thousands separators
fn parse_quantity(raw: &str) -> Result<f64, std::num::ParseFloatError> {
    if raw.contains(',') {
        raw.replace(',', "").parse()
    } else {
        raw.parse()
    }
}

/// Lazy sequence of quantities of one unit system in normalized text
///
/// A quantity is parking when a parking keyword appears anywhere between the
/// previous quantity and this one, or in the few words right after its unit.
/// A keyword already claimed by the previous quantity's trailing words is not
/// counted again. Quantities that fail to parse, fall outside the plausibility
/// bound, or are parking are skipped.
pub struct Quantities<'t> {
    text: &'t str,
    captures: CaptureMatches<'static, 't>,
    unit: AreaUnit,
    last_end: usize,
}

impl<'t> Quantities<'t> {
    fn new(text: &'t str, unit: AreaUnit) -> Self {
        let pattern: &'static Regex = match unit {
            AreaUnit::SquareMetre => &*METRIC_QUANTITY,
            AreaUnit::SquareFoot => &*IMPERIAL_QUANTITY,
        };
        Self {
            text,
            captures: pattern.captures_iter(text),
            unit,
            last_end: 0,
        }
    }
}

impl Iterator for Quantities<'_> {
    type Item = ExtractedQuantity;

    fn next(&mut self) -> Option<Self::Item> {
        for capture in self.captures.by_ref() {
            let Some(full_match) = capture.get(0) else {
                continue;
            };
            let preceding = &self.text[self.last_end..full_match.start()];
            let trailing = trailing_words(&self.text[full_match.end()..]);
            let trailing_is_parking = PARKING.is_match(trailing);
            self.last_end = if trailing_is_parking {
                full_match.end() + trailing.len()
            } else {
                full_match.end()
            };

            let raw = capture.name("quantity").map(|m| m.as_str()).unwrap_or("");
            let value = match parse_quantity(raw) {
                Ok(value) => value,
                Err(e) => {
                    // Non-ASCII digits (e.g. Devanagari numerals) land here
                    debug!(raw = %raw, error = %e, unit = %self.unit, "Discarding malformed number");
                    continue;
                }
            };

            if !(value > 0.0 && value < self.unit.plausibility_limit()) {
                trace!(value, unit = %self.unit, "Discarding implausible quantity");
                continue;
            }

            if trailing_is_parking || PARKING.is_match(preceding) {
                debug!(value, unit = %self.unit, preceding = %preceding, trailing = %trailing,
                       "Excluding parking quantity");
                continue;
            }

            let context = last_clause(preceding);

            trace!(value, unit = %self.unit, "Extracted quantity");
            return Some(ExtractedQuantity {
                value,
                unit: self.unit,
                context: context.trim().to_string(),
            });
        }
        None
    }
}

/// Text after the last clause separator
fn last_clause(segment: &str) -> &str {
    match segment.rfind(CLAUSE_SEPARATORS) {
        Some(idx) => &segment[idx + 1..],
        None => segment,
    }
}

/// Text before the first clause separator or the next number
fn first_clause(segment: &str) -> &str {
    let end = segment
        .find(|c: char| CLAUSE_SEPARATORS.contains(&c) || c.is_ascii_digit())
        .unwrap_or(segment.len());
    &segment[..end]
}

/// At most [`TRAILING_WORDS`] words of the clause that follows a unit token
fn trailing_words(segment: &str) -> &str {
    let clause = first_clause(segment);
    let mut words = 0;
    let mut in_word = false;
    for (idx, c) in clause.char_indices() {
        if c.is_whitespace() {
            if in_word {
                words += 1;
                in_word = false;
                if words == TRAILING_WORDS {
                    return &clause[..idx];
                }
            }
        } else {
            in_word = true;
        }
    }
    clause
}

/// Detector for area measurements in property descriptions
#[derive(Debug, Clone, Default)]
pub struct AreaDetector;

impl AreaDetector {
    /// Create a detector backed by the shared compiled patterns
    ///
    /// ```rust
    /// use realty_extract::text_processing::AreaDetector;
    ///
    /// let detector = AreaDetector::new();
    /// assert!(detector.has_measurements("Flat of 45 sq.mt carpet"));
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Quantities of `unit` in already-normalized text
    ///
    /// The sequence is recomputed on every call and holds no shared state.
    pub fn quantities<'t>(&self, normalized: &'t str, unit: AreaUnit) -> Quantities<'t> {
        Quantities::new(normalized, unit)
    }

    /// Normalize `text` and collect the quantities of `unit`
    pub fn extract_quantities(&self, text: &str, unit: AreaUnit) -> Vec<ExtractedQuantity> {
        let normalized = normalize_text(text);
        self.quantities(&normalized, unit).collect()
    }

    /// Value of an explicit total-area declaration such as `total area: 45 sq.mt`
    pub fn declared_total(&self, normalized: &str, unit: AreaUnit) -> Option<f64> {
        let pattern: &Regex = match unit {
            AreaUnit::SquareMetre => &*METRIC_DECLARED_TOTAL,
            AreaUnit::SquareFoot => &*IMPERIAL_DECLARED_TOTAL,
        };
        pattern
            .captures_iter(normalized)
            .filter_map(|capture| parse_quantity(capture.name("quantity")?.as_str()).ok())
            .find(|value| *value > 0.0)
    }

    /// Whether any unit token with a number appears in `text`
    pub fn has_measurements(&self, text: &str) -> bool {
        let normalized = normalize_text(text);
        METRIC_QUANTITY.is_match(&normalized) || IMPERIAL_QUANTITY.is_match(&normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str, unit: AreaUnit) -> Vec<f64> {
        AreaDetector::new()
            .extract_quantities(text, unit)
            .into_iter()
            .map(|q| q.value)
            .collect()
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("a\t\tb\n\nc"), "a b c");
        assert_eq!(normalize_text("10 sq.mt , 20 sq.mt"), "10 sq.mt, 20 sq.mt");
        assert_eq!(normalize_text("1,045 sq.ft"), "1,045 sq.ft");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_last_and_first_clause() {
        assert_eq!(last_clause(" parking,"), "");
        assert_eq!(last_clause("flat no 4; balcony "), " balcony ");
        assert_eq!(first_clause(" parking,45"), " parking");
        assert_eq!(first_clause(" open terrace 12"), " open terrace ");
    }

    #[test]
    fn test_trailing_words() {
        assert_eq!(trailing_words(" parking, 45"), " parking");
        assert_eq!(trailing_words(" car parking"), " car parking");
        assert_eq!(trailing_words(" with covered car parking"), " with covered");
        assert_eq!(trailing_words(""), "");
    }

    #[test]
    fn test_parking_keyword_behind_comma() {
        assert_eq!(
            values(
                "Flat 45 sq.mt, car parking no. 4, admeasuring 12 sq.mt",
                AreaUnit::SquareMetre
            ),
            vec![45.0]
        );
    }

    #[test]
    fn test_distant_parking_mention_keeps_flat() {
        assert_eq!(
            values("Flat admeasuring 45 sq.mt with covered car parking", AreaUnit::SquareMetre),
            vec![45.0]
        );
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(values("carpet 1,045 sq.ft", AreaUnit::SquareFoot), vec![1045.0]);
        assert_eq!(values("Flat No. 4, 450 sq.ft", AreaUnit::SquareFoot), vec![450.0]);
        assert_eq!(values("1,045.5 sqft", AreaUnit::SquareFoot), vec![1045.5]);
    }

    #[test]
    fn test_metric_and_imperial_are_separate() {
        let text = "carpet 45 sq.mt i.e. 484 sq.ft";
        assert_eq!(values(text, AreaUnit::SquareMetre), vec![45.0]);
        assert_eq!(values(text, AreaUnit::SquareFoot), vec![484.0]);
    }

    #[test]
    fn test_devanagari_units() {
        let text = "सदनिका क्षेत्र 45.5 चौ.मी व बाल्कनी 5 चौरस मीटर";
        assert_eq!(values(text, AreaUnit::SquareMetre), vec![45.5, 5.0]);
        assert_eq!(values("क्षेत्र 550 चौ.फूट", AreaUnit::SquareFoot), vec![550.0]);
    }

    #[test]
    fn test_devanagari_digits_are_discarded() {
        assert!(values("क्षेत्र ४५ चौ.मी", AreaUnit::SquareMetre).is_empty());
    }

    #[test]
    fn test_plausibility_bounds() {
        assert!(values("plot 500 sq.mt", AreaUnit::SquareMetre).is_empty());
        assert!(values("0 sq.mt", AreaUnit::SquareMetre).is_empty());
        assert_eq!(values("499.9 sq.mt", AreaUnit::SquareMetre), vec![499.9]);
        assert!(values("5000 sq.ft", AreaUnit::SquareFoot).is_empty());
        assert_eq!(values("4999 sqft", AreaUnit::SquareFoot), vec![4999.0]);
    }

    #[test]
    fn test_parking_before_and_after() {
        assert_eq!(
            values("10 sq.mt parking, 45 sq.mt total area", AreaUnit::SquareMetre),
            vec![45.0]
        );
        assert_eq!(
            values("Parking: 12 sq.mt, flat 40 sq.mt", AreaUnit::SquareMetre),
            vec![40.0]
        );
        assert_eq!(
            values("पार्किंग 10 चौ.मी, सदनिका 40 चौ.मी", AreaUnit::SquareMetre),
            vec![40.0]
        );
    }

    #[test]
    fn test_context_is_preceding_clause() {
        let found = AreaDetector::new()
            .extract_quantities("Flat 4, balcony 5 sq.mt", AreaUnit::SquareMetre);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context, "balcony");
    }

    #[test]
    fn test_quantities_are_restartable() {
        let detector = AreaDetector::new();
        let text = normalize_text("20 sq.mt and 25 sq.mt");
        let first: Vec<_> = detector.quantities(&text, AreaUnit::SquareMetre).collect();
        let second: Vec<_> = detector.quantities(&text, AreaUnit::SquareMetre).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_declared_total() {
        let detector = AreaDetector::new();
        let text = normalize_text("12 sq.mt + 30 sq.mt, total area: 45 sq.mt");
        assert_eq!(detector.declared_total(&text, AreaUnit::SquareMetre), Some(45.0));
        assert_eq!(detector.declared_total(&text, AreaUnit::SquareFoot), None);
        let marathi = normalize_text("एकूण क्षेत्र 52 चौ.मी");
        assert_eq!(
            detector.declared_total(&marathi, AreaUnit::SquareMetre),
            Some(52.0)
        );
    }

    #[test]
    fn test_has_measurements() {
        let detector = AreaDetector::new();
        assert!(detector.has_measurements("45 SQ.MT"));
        assert!(detector.has_measurements("550 sq ft"));
        assert!(!detector.has_measurements("Flat on 4th floor"));
        assert!(!detector.has_measurements(""));
    }
}
