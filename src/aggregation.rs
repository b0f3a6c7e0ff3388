//! # Aggregation
//!
//! Groups resolved per-record metrics by property and configuration (optionally
//! also by exact carpet area) and summarizes the rates of each group.
//!
//! Output ordering is deterministic: property, then configuration band, then
//! area ascending. Presentation layers rely on this to merge consecutive cells
//! that share a group key (see [`visual_blocks`]).

use crate::classification::Configuration;
use crate::pipeline::DerivedMetrics;
use crate::units::round3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How records are grouped into summary rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    PropertyConfiguration,
    PropertyConfigurationArea,
}

/// Summary statistics over a set of rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value; ties go to the smallest
    pub mode: f64,
    pub count: usize,
}

impl RateStats {
    /// Summarize `values`; `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        Some(Self {
            min: sorted[0],
            max: sorted[count - 1],
            mean: round3(mean),
            median: round3(median),
            mode: mode_of_sorted(&sorted),
            count,
        })
    }
}

/// First value of the longest run in an ascending slice
fn mode_of_sorted(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_len = 0;
    let mut run_start = 0;
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i].total_cmp(&sorted[run_start]) != Ordering::Equal {
            let run_len = i - run_start;
            if run_len > best_len {
                best = sorted[run_start];
                best_len = run_len;
            }
            run_start = i;
        }
    }
    best
}

/// One grouped row of the summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub property: String,
    pub configuration: Configuration,
    /// Group area in square feet: the exact area when grouping by area,
    /// otherwise the mean of the group's carpet areas
    pub area_sqft: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub avg_rate: f64,
    pub median_rate: f64,
    pub mode_rate: f64,
    pub count: usize,
}

/// Area in thousandths, so that keys order and compare exactly
type AreaKey = i64;

fn area_key(area_sqft: f64) -> AreaKey {
    (area_sqft * 1000.0).round() as AreaKey
}

/// Group resolved metrics and compute rate statistics per group
///
/// Records with zero area are skipped; they stay visible only in per-record output.
pub fn aggregate(metrics: &[DerivedMetrics], grouping: Grouping) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(String, Configuration, AreaKey), Vec<&DerivedMetrics>> =
        BTreeMap::new();

    for m in metrics.iter().filter(|m| m.is_resolved()) {
        let area = match grouping {
            Grouping::PropertyConfiguration => 0,
            Grouping::PropertyConfigurationArea => area_key(m.carpet_area_sqft),
        };
        groups
            .entry((m.property.clone(), m.configuration, area))
            .or_default()
            .push(m);
    }

    groups
        .into_iter()
        .filter_map(|((property, configuration, area), members)| {
            let rates: Vec<f64> = members.iter().map(|m| m.rate).collect();
            let stats = RateStats::from_values(&rates)?;
            let area_sqft = match grouping {
                Grouping::PropertyConfigurationArea => area as f64 / 1000.0,
                Grouping::PropertyConfiguration => round3(
                    members.iter().map(|m| m.carpet_area_sqft).sum::<f64>() / members.len() as f64,
                ),
            };
            Some(SummaryRow {
                property,
                configuration,
                area_sqft,
                min_rate: stats.min,
                max_rate: stats.max,
                avg_rate: stats.mean,
                median_rate: stats.median,
                mode_rate: stats.mode,
                count: stats.count,
            })
        })
        .collect()
}

/// A run of consecutive summary rows sharing property and configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualBlock {
    pub property: String,
    pub configuration: Configuration,
    /// Index of the first row of the block
    pub start: usize,
    pub len: usize,
}

/// Split ordered summary rows into blocks for merged-cell rendering
pub fn visual_blocks(rows: &[SummaryRow]) -> Vec<VisualBlock> {
    let mut blocks: Vec<VisualBlock> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match blocks.last_mut() {
            Some(block)
                if block.property == row.property && block.configuration == row.configuration =>
            {
                block.len += 1;
            }
            _ => blocks.push(VisualBlock {
                property: row.property.clone(),
                configuration: row.configuration,
                start: index,
                len: 1,
            }),
        }
    }
    blocks
}
