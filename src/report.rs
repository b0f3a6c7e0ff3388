//! # Report Output
//!
//! Bundles the augmented rows, the grouped summary and its visual blocks into a
//! single JSON document.

use crate::aggregation::{visual_blocks, SummaryRow, VisualBlock};
use crate::errors::{error_logging, AppError, AppResult};
use crate::pipeline::PipelineOutput;
use crate::records::Row;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Serialized result of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    /// Redacted configuration summary
    pub configuration: String,
    pub records: usize,
    pub unresolved: usize,
    pub rows: Vec<Row>,
    pub summary: Vec<SummaryRow>,
    pub blocks: Vec<VisualBlock>,
}

impl Report {
    pub fn new(output: PipelineOutput, configuration: String) -> Self {
        let blocks = visual_blocks(&output.summary);
        let unresolved = output.unresolved_count();
        Self {
            generated_at: Utc::now(),
            configuration,
            records: output.rows.len(),
            unresolved,
            rows: output.rows,
            summary: output.summary,
            blocks,
        }
    }

    /// Replace the rows, e.g. after enrichment appended columns
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.records = rows.len();
        self.rows = rows;
        self
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, replacing any existing file
    pub fn write_to(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            error_logging::log_filesystem_error(&e, "write_report", path.to_str());
            AppError::FileSystem(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!(
            path = %path.display(),
            rows = self.rows.len(),
            groups = self.summary.len(),
            "Report written"
        );
        Ok(())
    }

    /// Read a previously written report
    pub fn read_from(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}
