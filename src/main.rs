use anyhow::Result;
use realty_extract::config::AppConfig;
use realty_extract::enrichment::{Enricher, HttpCollaborators};
use realty_extract::errors::error_logging;
use realty_extract::lookup::{InMemoryLookup, PropertyMetadataLookup};
use realty_extract::observability;
use realty_extract::pipeline::Pipeline;
use realty_extract::records::{Row, Table};
use realty_extract::report::Report;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Load the property metadata lookup, empty when no file is configured
fn load_lookup(config: &AppConfig) -> Result<Arc<dyn PropertyMetadataLookup>> {
    let lookup = match &config.io.property_metadata_path {
        Some(path) => InMemoryLookup::from_json_file(path)?,
        None => InMemoryLookup::new(),
    };
    Ok(Arc::new(lookup))
}

/// Append distance and market columns; rows not reached before cancellation stay as-is
async fn enrich_rows(config: &AppConfig, rows: Vec<Row>) -> Result<Vec<Row>> {
    let project_url = match &config.enrichment.project_maps_url {
        Some(url) => url.clone(),
        None => return Ok(rows),
    };

    let http = HttpCollaborators::new(&config.enrichment)?;
    let project = match http.resolve_project(&project_url).await {
        Ok(Some(coordinates)) => coordinates,
        Ok(None) => {
            warn!("Project map link has no coordinates, skipping enrichment");
            return Ok(rows);
        }
        Err(e) => {
            warn!(error = %e, "Could not resolve project map link, skipping enrichment");
            return Ok(rows);
        }
    };
    info!(
        latitude = project.latitude,
        longitude = project.longitude,
        "Starting enrichment"
    );

    let enricher = Enricher::new(
        http.clone(),
        http.clone(),
        http,
        load_lookup(config)?,
        config.enrichment.clone(),
    );

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping enrichment");
            ctrl_c_token.cancel();
        }
    });

    let outcome = enricher
        .enrich(&rows, &config.columns.property, project, &cancel)
        .await;
    let completed = outcome.rows.len();
    let mut enriched = outcome.rows;
    enriched.extend(rows.into_iter().skip(completed));
    Ok(enriched)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "load_config");
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    observability::init_tracing_with_config(&config.observability)?;
    info!("{}", config.summary());

    let table = Table::from_json_file(&config.io.input_path)?;
    let pipeline = Pipeline::new(config.pipeline.clone())?;

    let output = match pipeline.run(&table, &config.columns) {
        Ok(output) => output,
        Err(e) => {
            error_logging::log_pipeline_error(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut report = Report::new(output, config.summary());
    if config.enrichment.is_enabled() {
        let rows = std::mem::take(&mut report.rows);
        report = report.with_rows(enrich_rows(&config, rows).await?);
    }

    report.write_to(&config.io.output_path)?;
    info!(
        records = report.records,
        unresolved = report.unresolved,
        groups = report.summary.len(),
        output = %config.io.output_path,
        "Run complete"
    );
    Ok(ExitCode::SUCCESS)
}
