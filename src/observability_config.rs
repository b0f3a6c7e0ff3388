//! # Observability Configuration
//!
//! Environment-specific logging and metrics settings for batch runs.

use crate::errors::{AppError, AppResult};
use std::env;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the crate's own targets
    pub log_level: String,
    /// Explicit log format; defaults by environment when unset
    pub log_format: Option<LogFormat>,
    /// Whether pipeline metrics are recorded
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: None,
            enable_metrics: true,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("OBSERVABILITY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").ok().and_then(|f| parse_log_format(&f)),
            enable_metrics: env::var("ENABLE_METRICS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        }
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Pretty output in development, JSON elsewhere, unless set explicitly
    pub fn effective_log_format(&self) -> LogFormat {
        self.log_format.unwrap_or(if self.is_development() {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}', expected one of {}",
                self.log_level,
                LEVELS.join(", ")
            )));
        }
        if self.environment.trim().is_empty() {
            return Err(AppError::Config("Environment cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_lowercase().as_str() {
        "pretty" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_level, "info");
        assert!(config.enable_metrics);
        assert_eq!(config.effective_log_format(), LogFormat::Pretty);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(parse_log_format(" JSON "), Some(LogFormat::Json));
        assert_eq!(parse_log_format("pretty"), Some(LogFormat::Pretty));
        assert_eq!(parse_log_format("xml"), None);
    }

    #[test]
    fn test_environment_detection() {
        let staging = ObservabilityConfig {
            environment: "staging".to_string(),
            ..Default::default()
        };
        assert!(!staging.is_development());
        assert_eq!(staging.effective_log_format(), LogFormat::Json);

        let explicit = ObservabilityConfig {
            log_format: Some(LogFormat::Pretty),
            ..staging
        };
        assert_eq!(explicit.effective_log_format(), LogFormat::Pretty);
    }
}
