//! # Realty Extract
//!
//! Derives carpet area, configuration and rate per square foot from free-text
//! property transaction descriptions, then groups the results into a per-property
//! summary. An optional enrichment stage adds driving distance and market data.

pub mod aggregation;
pub mod area;
pub mod circuit_breaker;
pub mod classification;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod lookup;
pub mod market;
pub mod measurement_patterns;
pub mod observability;
pub mod observability_config;
pub mod pipeline;
pub mod rate;
pub mod records;
pub mod report;
pub mod text_processing;
pub mod units;

// Re-export types for easier access
pub use aggregation::{Grouping, SummaryRow};
pub use area::{AreaResolver, Resolution, ResolvedArea};
pub use classification::{classify, Configuration, ConfigurationThresholds};
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use pipeline::{DerivedMetrics, Pipeline, PipelineOutput};
pub use records::{PropertyRecord, Table};
pub use text_processing::{AreaDetector, ExtractedQuantity};
