//! # Measurement Patterns
//!
//! Closed vocabulary of the keywords recognized in property descriptions. Every
//! concept (metric unit, imperial unit, parking, declared total) is listed once
//! per script and compiled into a single alternation by [`alternation`].
//!
//! Two scripts are supported:
//!
//! - **Latin**: English abbreviations and spellings (`sq.mt`, `sq.ft`, `square feet`)
//! - **Devanagari**: Marathi spellings as they appear in registered sale deeds
//!   (`चौ.मी`, `चौरस फूट`, `पार्किंग`)
//!
//! Tokens are matched case-insensitively against text whose whitespace has been
//! collapsed, so a single space is enough to cover spaced variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Writing system a keyword belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Devanagari,
}

/// Area unit system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    /// Square metres (preferred when resolving)
    SquareMetre,
    /// Square feet
    SquareFoot,
}

impl AreaUnit {
    /// Resolution preference order: metric first, imperial as fallback
    pub const PREFERENCE: [AreaUnit; 2] = [AreaUnit::SquareMetre, AreaUnit::SquareFoot];

    /// Exclusive upper plausibility bound; larger numbers are floor counts,
    /// survey numbers or phone digits rather than areas
    pub fn plausibility_limit(self) -> f64 {
        match self {
            AreaUnit::SquareMetre => 500.0,
            AreaUnit::SquareFoot => 5000.0,
        }
    }

    /// Short label used in logs and column names
    pub fn symbol(self) -> &'static str {
        match self {
            AreaUnit::SquareMetre => "sq.mt",
            AreaUnit::SquareFoot => "sq.ft",
        }
    }

    /// Unit tokens for this system across both scripts
    pub fn tokens(self) -> impl Iterator<Item = &'static str> {
        let sets: [&'static [&'static str]; 2] = match self {
            AreaUnit::SquareMetre => [METRIC_LATIN, METRIC_DEVANAGARI],
            AreaUnit::SquareFoot => [IMPERIAL_LATIN, IMPERIAL_DEVANAGARI],
        };
        sets.into_iter().flat_map(|set| set.iter().copied())
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Square-metre tokens, Latin script
pub const METRIC_LATIN: &[&str] = &[
    "square meters",
    "square meter",
    "square metres",
    "square metre",
    "sq. meters",
    "sq. meter",
    "sq.meters",
    "sq.meter",
    "sq meters",
    "sq meter",
    "sq. metres",
    "sq.metres",
    "sq. mtrs",
    "sq.mtrs",
    "sq mtrs",
    "sq. mtr",
    "sq.mtr",
    "sq mtr",
    "sq. mts",
    "sq.mts",
    "sq. mt",
    "sq.mt",
    "sq mt",
    "sqmt",
    "sq. m",
    "sq.m",
    "sqm",
    "m²",
];

/// Square-metre tokens, Devanagari script
pub const METRIC_DEVANAGARI: &[&str] = &[
    "चौरस मीटर",
    "चौ. मीटर",
    "चौ.मीटर",
    "चौ. मी.",
    "चौ.मी.",
    "चौ. मी",
    "चौ.मी",
    "चौमी",
];

/// Square-foot tokens, Latin script
pub const IMPERIAL_LATIN: &[&str] = &[
    "square feet",
    "square foot",
    "sq. feet",
    "sq.feet",
    "sq feet",
    "sq. ft.",
    "sq.ft.",
    "sq. ft",
    "sq.ft",
    "sq ft",
    "sqft",
    "ft²",
];

/// Square-foot tokens, Devanagari script
pub const IMPERIAL_DEVANAGARI: &[&str] = &[
    "चौरस फूट",
    "चौ. फूट",
    "चौ.फूट",
    "चौ. फु.",
    "चौ.फु.",
    "चौ. फु",
    "चौ.फु",
];

/// Parking allocation keywords; both Devanagari spellings occur in deeds
pub const PARKING_KEYWORDS: &[(&str, Script)] = &[
    ("parking", Script::Latin),
    ("पार्किंग", Script::Devanagari),
    ("पार्कींग", Script::Devanagari),
];

/// Keywords introducing an explicit total-area declaration
pub const TOTAL_AREA_KEYWORDS: &[(&str, Script)] = &[
    ("total carpet area", Script::Latin),
    ("total area", Script::Latin),
    ("एकूण क्षेत्रफळ", Script::Devanagari),
    ("एकूण क्षेत्र", Script::Devanagari),
];

/// Build a regex alternation from literal tokens
///
/// Tokens are deduplicated, escaped and ordered longest first so the
/// leftmost-first alternation never stops at a prefix (`sq.m` inside `sq.mtr`).
pub fn alternation<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    let mut unique: Vec<&str> = tokens.into_iter().collect();
    unique.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    unique.dedup();
    unique
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

/// Keywords of a `(keyword, script)` table, optionally restricted to one script
pub fn keywords_for(
    table: &'static [(&'static str, Script)],
    script: Option<Script>,
) -> impl Iterator<Item = &'static str> {
    table
        .iter()
        .filter(move |(_, s)| script.map_or(true, |wanted| *s == wanted))
        .map(|(keyword, _)| *keyword)
}
