//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! all run settings into a single, structured configuration object.
//! It supports loading from environment variables, validation, and provides
//! a redacted summary for logging.

use crate::classification::ConfigurationThresholds;
use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::rate::DEFAULT_LOADING_FACTOR;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Parameters of the per-record derivation and aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Saleable-to-carpet multiplier, must exceed 1.0
    pub loading_factor: f64,
    /// Square-foot bands for configuration classification
    pub thresholds: ConfigurationThresholds,
    /// Whether summary groups are split further by exact carpet area
    pub group_by_area: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            loading_factor: DEFAULT_LOADING_FACTOR,
            thresholds: ConfigurationThresholds::default(),
            group_by_area: false,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline configuration
    pub fn validate(&self) -> AppResult<()> {
        if !self.loading_factor.is_finite() || self.loading_factor <= 1.0 {
            return Err(AppError::Config(format!(
                "Loading factor must be greater than 1.0, got {}",
                self.loading_factor
            )));
        }
        if self.loading_factor > 5.0 {
            return Err(AppError::Config(format!(
                "Loading factor {} is implausibly large (max 5.0)",
                self.loading_factor
            )));
        }
        self.thresholds.validate()
    }
}

/// Names of the required input columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub description: String,
    pub consideration: String,
    pub property: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            description: "Description".to_string(),
            consideration: "Consideration".to_string(),
            property: "Property".to_string(),
        }
    }
}

impl ColumnConfig {
    /// Required column names in a stable order
    pub fn required(&self) -> Vec<String> {
        vec![
            self.description.clone(),
            self.consideration.clone(),
            self.property.clone(),
        ]
    }

    /// Validate column configuration
    pub fn validate(&self) -> AppResult<()> {
        let required = self.required();
        if required.iter().any(|c| c.trim().is_empty()) {
            return Err(AppError::Config("Column names cannot be empty".to_string()));
        }
        let mut lowered: Vec<String> = required.iter().map(|c| c.trim().to_lowercase()).collect();
        lowered.sort();
        lowered.dedup();
        if lowered.len() != required.len() {
            return Err(AppError::Config(
                "Description, consideration and property columns must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the optional network enrichment stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Google Maps link of the reference project; enrichment runs only when set
    pub project_maps_url: Option<String>,
    /// Per-call HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// Minimum delay between consecutive external calls in milliseconds
    pub min_call_delay_ms: u64,
    /// Maximum number of retries per call
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Consecutive failures before the circuit breaker opens
    pub circuit_breaker_threshold: u32,
    /// Seconds before an open circuit breaker lets calls through again
    pub circuit_breaker_reset_secs: u64,
    /// City used when neither the row nor the metadata lookup provides one
    pub default_city: String,
    /// User agent sent to public services
    pub user_agent: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            project_maps_url: None,
            http_timeout_secs: 10,
            min_call_delay_ms: 1200,
            max_retries: 1,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
            default_city: "Pune".to_string(),
            user_agent: "realty-extract/0.1".to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn is_enabled(&self) -> bool {
        self.project_maps_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Validate enrichment configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }
        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }
        if self.base_retry_delay_ms > self.max_retry_delay_ms {
            return Err(AppError::Config(
                "Base retry delay cannot exceed max retry delay".to_string(),
            ));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "Circuit breaker threshold cannot be 0".to_string(),
            ));
        }
        if self.default_city.trim().is_empty() {
            return Err(AppError::Config("Default city cannot be empty".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(AppError::Config("User agent cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    /// JSON array of input rows
    pub input_path: String,
    /// Destination of the JSON report
    pub output_path: String,
    /// Optional JSON object mapping property names to metadata
    pub property_metadata_path: Option<String>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_path: "input.json".to_string(),
            output_path: "report.json".to_string(),
            property_metadata_path: None,
        }
    }
}

impl IoConfig {
    /// Validate IO configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.input_path.trim().is_empty() {
            return Err(AppError::Config("Input path cannot be empty".to_string()));
        }
        if self.output_path.trim().is_empty() {
            return Err(AppError::Config("Output path cannot be empty".to_string()));
        }
        if self.input_path == self.output_path {
            return Err(AppError::Config(
                "Input and output paths cannot be the same".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Derivation parameters
    pub pipeline: PipelineConfig,
    /// Input column names
    pub columns: ColumnConfig,
    /// Network enrichment settings
    pub enrichment: EnrichmentConfig,
    /// File locations
    pub io: IoConfig,
    /// Logging configuration
    pub observability: ObservabilityConfig,
}

fn parse_env<T: FromStr>(key: &str, default: &str, what: &str) -> AppResult<T> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a valid {}", key, what)))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        // Pipeline parameters
        config.pipeline.loading_factor = parse_env("LOADING_FACTOR", "1.35", "number")?;
        config.pipeline.thresholds = ConfigurationThresholds {
            t1: parse_env("CONFIG_THRESHOLD_1", "600", "number")?,
            t2: parse_env("CONFIG_THRESHOLD_2", "850", "number")?,
            t3: parse_env("CONFIG_THRESHOLD_3", "1100", "number")?,
        };
        config.pipeline.group_by_area = env::var("GROUP_BY_AREA")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        // Column names
        if let Some(name) = optional_env("DESCRIPTION_COLUMN") {
            config.columns.description = name;
        }
        if let Some(name) = optional_env("CONSIDERATION_COLUMN") {
            config.columns.consideration = name;
        }
        if let Some(name) = optional_env("PROPERTY_COLUMN") {
            config.columns.property = name;
        }

        // Enrichment
        config.enrichment.project_maps_url = optional_env("PROJECT_MAPS_URL");
        config.enrichment.http_timeout_secs =
            parse_env("HTTP_CLIENT_TIMEOUT_SECS", "10", "number of seconds")?;
        config.enrichment.min_call_delay_ms =
            parse_env("ENRICHMENT_DELAY_MS", "1200", "number of milliseconds")?;
        config.enrichment.max_retries = parse_env("ENRICHMENT_MAX_RETRIES", "1", "number")?;
        if let Some(city) = optional_env("DEFAULT_CITY") {
            config.enrichment.default_city = city;
        }

        // Files
        if let Some(path) = optional_env("INPUT_PATH") {
            config.io.input_path = path;
        }
        if let Some(path) = optional_env("OUTPUT_PATH") {
            config.io.output_path = path;
        }
        config.io.property_metadata_path = optional_env("PROPERTY_METADATA_PATH");

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.pipeline.validate()?;
        self.columns.validate()?;
        self.enrichment.validate()?;
        self.io.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: loading_factor={}, thresholds={}/{}/{}, group_by_area={}, input={}, output={}, enrichment_enabled={}, project_url=[REDACTED]",
            self.pipeline.loading_factor,
            self.pipeline.thresholds.t1,
            self.pipeline.thresholds.t2,
            self.pipeline.thresholds.t3,
            self.pipeline.group_by_area,
            self.io.input_path,
            self.io.output_path,
            self.enrichment.is_enabled()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.enrichment.is_enabled());
    }

    #[test]
    fn test_pipeline_config_validation() {
        let mut config = PipelineConfig::default();
        assert!(config.validate().is_ok());

        // Invalid: loading factor must exceed 1.0
        config.loading_factor = 1.0;
        assert!(config.validate().is_err());
        config.loading_factor = 0.8;
        assert!(config.validate().is_err());
        config.loading_factor = f64::NAN;
        assert!(config.validate().is_err());
        config.loading_factor = 1.35;

        // Invalid: thresholds not increasing
        config.thresholds.t2 = 500.0;
        assert!(config.validate().is_err());
        config.thresholds.t2 = 850.0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_column_config_validation() {
        let mut config = ColumnConfig::default();
        assert!(config.validate().is_ok());

        config.property = " description ".to_string();
        assert!(config.validate().is_err());

        config.property = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enrichment_config_validation() {
        let mut config = EnrichmentConfig::default();
        assert!(config.validate().is_ok());

        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.http_timeout_secs = 10;

        config.base_retry_delay_ms = 10_000;
        assert!(config.validate().is_err());
        config.base_retry_delay_ms = 500;

        config.project_maps_url = Some("   ".to_string());
        assert!(!config.is_enabled());
        config.project_maps_url = Some("https://www.google.com/maps/@18.5,73.8,15z".to_string());
        assert!(config.is_enabled());
    }

    #[test]
    fn test_io_config_validation() {
        let mut config = IoConfig::default();
        assert!(config.validate().is_ok());
        config.output_path = config.input_path.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_redacts_project_url() {
        let mut config = AppConfig::default();
        config.enrichment.project_maps_url = Some("https://maps.app/secret".to_string());
        let summary = config.summary();
        assert!(!summary.contains("secret"));
        assert!(summary.contains("loading_factor=1.35"));
    }
}
