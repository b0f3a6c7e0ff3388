//! # Derivation Pipeline
//!
//! Runs every record through resolve → convert → classify → rate, then hands the
//! complete set to the aggregator. Each record is derived independently from its
//! own text and consideration; aggregation waits for the whole batch.

use crate::aggregation::{self, Grouping, SummaryRow};
use crate::area::{AreaResolver, ResolutionPath};
use crate::classification::{classify, Configuration};
use crate::config::{ColumnConfig, PipelineConfig};
use crate::errors::AppResult;
use crate::measurement_patterns::AreaUnit;
use crate::observability;
use crate::rate::{rate, saleable_area};
use crate::records::{PropertyRecord, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// Names of the columns appended to every input row
pub mod columns {
    pub const CARPET_AREA_SQMT: &str = "Carpet Area (sq.mt)";
    pub const CARPET_AREA_SQFT: &str = "Carpet Area (sq.ft)";
    pub const SALEABLE_AREA_SQFT: &str = "Saleable Area (sq.ft)";
    pub const RATE: &str = "APR";
    pub const CONFIGURATION: &str = "Configuration";
}

/// Metrics derived from one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub property: String,
    pub carpet_area_sqmt: f64,
    pub carpet_area_sqft: f64,
    pub saleable_area_sqft: f64,
    pub configuration: Configuration,
    /// Consideration per square foot of saleable area
    pub rate: f64,
    /// Unit the area was written in
    pub source_unit: AreaUnit,
    pub resolution_path: ResolutionPath,
}

impl DerivedMetrics {
    pub fn is_resolved(&self) -> bool {
        self.carpet_area_sqft > 0.0
    }
}

/// Output of one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Original rows with the derived columns appended, in input order
    pub rows: Vec<Row>,
    /// Derived metrics, in input order
    pub metrics: Vec<DerivedMetrics>,
    /// Grouped statistics over resolved records
    pub summary: Vec<SummaryRow>,
}

impl PipelineOutput {
    pub fn unresolved_count(&self) -> usize {
        self.metrics.iter().filter(|m| !m.is_resolved()).count()
    }
}

/// Per-record derivation plus aggregation
#[derive(Debug, Clone)]
pub struct Pipeline {
    resolver: AreaResolver,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline after validating its configuration
    pub fn new(config: PipelineConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            resolver: AreaResolver::new(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Derive area, configuration and rate for a single record
    pub fn derive(&self, record: &PropertyRecord) -> DerivedMetrics {
        let resolution = self.resolver.resolve(&record.description);
        observability::record_resolution_metrics(resolution.path);

        let carpet_area_sqmt = resolution.area.square_metres();
        let carpet_area_sqft = resolution.area.square_feet();
        let saleable_area_sqft = saleable_area(carpet_area_sqft, self.config.loading_factor);
        let configuration = classify(carpet_area_sqft, &self.config.thresholds);
        let rate = rate(record.consideration, saleable_area_sqft);

        debug!(
            property = %record.property,
            carpet_area_sqft,
            configuration = %configuration,
            rate,
            "Derived record metrics"
        );

        DerivedMetrics {
            property: record.property.clone(),
            carpet_area_sqmt,
            carpet_area_sqft,
            saleable_area_sqft,
            configuration,
            rate,
            source_unit: resolution.area.unit,
            resolution_path: resolution.path,
        }
    }

    /// Derive metrics for every record, preserving order
    pub fn derive_all(&self, records: &[PropertyRecord]) -> Vec<DerivedMetrics> {
        records.iter().map(|record| self.derive(record)).collect()
    }

    /// Grouping mode implied by the configuration
    pub fn grouping(&self) -> Grouping {
        if self.config.group_by_area {
            Grouping::PropertyConfigurationArea
        } else {
            Grouping::PropertyConfiguration
        }
    }

    /// Process a whole table: derive every row, then aggregate
    ///
    /// Fails only when a required column is missing.
    pub fn run(&self, table: &Table, columns: &ColumnConfig) -> AppResult<PipelineOutput> {
        let span = observability::pipeline_span("run");
        let _enter = span.enter();
        let start_time = Instant::now();

        let records = table.records(columns)?;
        let metrics = self.derive_all(&records);
        let rows = records
            .iter()
            .zip(&metrics)
            .map(|(record, derived)| augment_row(&record.fields, derived))
            .collect();
        let summary = aggregation::aggregate(&metrics, self.grouping());

        let output = PipelineOutput {
            rows,
            metrics,
            summary,
        };
        let duration = start_time.elapsed();
        observability::record_batch_metrics(
            output.metrics.len(),
            output.unresolved_count(),
            output.summary.len(),
            duration,
        );
        info!(
            records = output.metrics.len(),
            unresolved = output.unresolved_count(),
            groups = output.summary.len(),
            duration_ms = duration.as_millis() as u64,
            "Pipeline run completed"
        );
        Ok(output)
    }
}

/// Derive metrics for one record with a throwaway pipeline
pub fn derive_metrics(record: &PropertyRecord, config: &PipelineConfig) -> AppResult<DerivedMetrics> {
    Ok(Pipeline::new(config.clone())?.derive(record))
}

/// Run a whole table with the given configuration
pub fn process_table(
    table: &Table,
    config: &PipelineConfig,
    columns: &ColumnConfig,
) -> AppResult<PipelineOutput> {
    Pipeline::new(config.clone())?.run(table, columns)
}

/// Append the derived columns to a copy of `row`
pub fn augment_row(row: &Row, derived: &DerivedMetrics) -> Row {
    let mut augmented = row.clone();
    augmented.insert(
        columns::CARPET_AREA_SQMT.to_string(),
        Value::from(derived.carpet_area_sqmt),
    );
    augmented.insert(
        columns::CARPET_AREA_SQFT.to_string(),
        Value::from(derived.carpet_area_sqft),
    );
    augmented.insert(
        columns::SALEABLE_AREA_SQFT.to_string(),
        Value::from(derived.saleable_area_sqft),
    );
    augmented.insert(columns::RATE.to_string(), Value::from(derived.rate));
    augmented.insert(
        columns::CONFIGURATION.to_string(),
        Value::from(derived.configuration.label()),
    );
    augmented
}
