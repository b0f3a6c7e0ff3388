//! Observability module for logging setup and pipeline metrics.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Metrics recording through the `metrics` facade (no-op unless a recorder is installed),
//!   switched off entirely by `ENABLE_METRICS=false`
//! - Span helpers for pipeline stages

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::prelude::*;

use crate::area::ResolutionPath;
use crate::observability_config::{LogFormat, ObservabilityConfig};

static METRICS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn metric recording on or off for the whole process
pub fn set_metrics_enabled(enabled: bool) {
    METRICS_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Whether the `record_*` helpers emit anything
pub fn metrics_enabled() -> bool {
    METRICS_ENABLED.load(Ordering::Relaxed)
}

/// Initialize structured logging from environment configuration
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(&ObservabilityConfig::from_env())
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;
    set_metrics_enabled(config.enable_metrics);

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("realty_extract={}", config.log_level.to_lowercase()).parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    match config.effective_log_format() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?,
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        metrics = config.enable_metrics,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Span covering one pipeline stage
pub fn pipeline_span(stage: &str) -> tracing::Span {
    tracing::info_span!("pipeline", stage = %stage)
}

/// Span covering one external collaborator call
pub fn enrichment_span(collaborator: &str, record_index: usize) -> tracing::Span {
    tracing::debug_span!("enrichment", collaborator = %collaborator, record_index = record_index)
}

/// Record how a record's area was resolved
pub fn record_resolution_metrics(path: ResolutionPath) {
    if !metrics_enabled() {
        return;
    }
    let path = match path {
        ResolutionPath::DeclaredTotal => "declared_total",
        ResolutionPath::PrecomputedSubtotal => "precomputed_subtotal",
        ResolutionPath::Sum => "sum",
        ResolutionPath::Unresolved => "unresolved",
    };
    metrics::counter!("area_resolutions_total", "path" => path).increment(1);
}

/// Record totals for a processed batch
pub fn record_batch_metrics(records: usize, unresolved: usize, groups: usize, duration: Duration) {
    if !metrics_enabled() {
        return;
    }
    metrics::counter!("records_processed_total").increment(records as u64);
    metrics::counter!("records_unresolved_total").increment(unresolved as u64);
    metrics::gauge!("summary_groups").set(groups as f64);
    metrics::histogram!("batch_duration_seconds").record(duration.as_secs_f64());

    let ops_per_sec = if duration.as_secs_f64() > 0.0 {
        records as f64 / duration.as_secs_f64()
    } else {
        0.0
    };
    metrics::histogram!("batch_throughput_records_per_sec").record(ops_per_sec);
}

/// Record one external collaborator call
pub fn record_enrichment_metrics(collaborator: &str, success: bool, duration: Duration) {
    if !metrics_enabled() {
        return;
    }
    let status = if success { "success" } else { "failure" };
    metrics::counter!(
        "enrichment_calls_total",
        "collaborator" => collaborator.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "enrichment_call_duration_seconds",
        "collaborator" => collaborator.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Update circuit breaker state gauge
pub fn update_circuit_breaker_state(is_open: bool) {
    if !metrics_enabled() {
        return;
    }
    metrics::gauge!("enrichment_circuit_breaker_open").set(if is_open { 1.0 } else { 0.0 });
}
