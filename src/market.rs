//! # Market Text Parsing
//!
//! Pulls configuration mentions and a ticket size out of free-form listing or
//! search-result text, and project coordinates out of map links.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Shown when no configuration is mentioned
pub const CONFIGURATIONS_PLACEHOLDER: &str = "2 BHK, 3 BHK (Likely)";
/// Shown when no price is mentioned
pub const TICKET_SIZE_PLACEHOLDER: &str = "See Market Rates";

lazy_static! {
    static ref BHK: Regex = Regex::new(r"(?i)[1-5]\s?bhk").expect("BHK pattern should be valid");

    /// Price patterns in priority order; the first with any match wins
    static ref PRICE_PATTERNS: Vec<Regex> = [
        r"(\d+\.?\d*\s?cr(?:ore)?)",
        r"(\d+\.?\d*\s?lakh(?:s)?)",
        r"(\d+\.?\d*\s?lac(?:s)?)",
        r"(?:rs\.?|₹)\s?(\d+\.?\d*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Price pattern should be valid"))
    .collect();

    static ref AT_COORDINATES: Regex =
        Regex::new(r"@([-.\d]+),([-.\d]+)").expect("Coordinate pattern should be valid");
    static ref DATA_COORDINATES: Regex =
        Regex::new(r"!3d([-.\d]+)!4d([-.\d]+)").expect("Coordinate pattern should be valid");
}

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Distinct configurations like `1BHK, 3BHK`, or the placeholder
pub fn extract_configurations(text: &str) -> String {
    let found: BTreeSet<String> = BHK
        .find_iter(text)
        .map(|m| m.as_str().to_uppercase().replace(char::is_whitespace, ""))
        .collect();
    if found.is_empty() {
        CONFIGURATIONS_PLACEHOLDER.to_string()
    } else {
        found.into_iter().collect::<Vec<_>>().join(", ")
    }
}

/// First price mention in priority order (crore, lakh, lac, rupee-prefixed)
pub fn extract_ticket_size(text: &str) -> String {
    let text = text.to_lowercase();
    PRICE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(&text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| TICKET_SIZE_PLACEHOLDER.to_string())
}

/// Coordinates embedded in a full map URL (`@lat,lon` or `!3dlat!4dlon`)
pub fn extract_coordinates(url: &str) -> Option<Coordinates> {
    [&*AT_COORDINATES, &*DATA_COORDINATES]
        .into_iter()
        .find_map(|pattern| {
            let caps = pattern.captures(url)?;
            let latitude = caps[1].parse().ok()?;
            let longitude = caps[2].parse().ok()?;
            Some(Coordinates::new(latitude, longitude))
        })
}

/// Whether a map link must be followed before coordinates can be read
pub fn needs_redirect(url: &str) -> bool {
    url.contains("goo.gl") || url.contains("google")
}
