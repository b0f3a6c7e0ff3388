//! # Enrichment
//!
//! Optional network stage that appends distance and market columns to each row.
//!
//! For every row it geocodes `"{society}, {locality}, {city}"`, asks a routing
//! service for the driving distance from the project, and searches the web for
//! prices and configurations. Calls are sequential, bounded by a timeout, spaced
//! by a minimum delay and retried with jittered backoff. Any failure becomes a
//! placeholder label; nothing here aborts the batch.

use crate::circuit_breaker::CircuitBreaker;
use crate::config::EnrichmentConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::lookup::PropertyMetadataLookup;
use crate::market::{self, Coordinates};
use crate::observability;
use crate::records::{value_to_text, Row};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Names of the columns appended by enrichment
pub mod columns {
    pub const DISTANCE: &str = "Distance from project";
    pub const TICKET_SIZE: &str = "Ticket Size";
    pub const CONFIGURATIONS: &str = "Configurations";
    /// Optional input columns read before falling back to the metadata lookup
    pub const LOCALITY: &str = "locality";
    pub const CITY: &str = "city";
}

/// Placeholder labels for failed lookups
pub mod labels {
    pub const LOCATION_NOT_FOUND: &str = "Location Not Found";
    pub const ROUTE_ERROR: &str = "Route Error";
    pub const SEARCH_ERROR: &str = "Search Error";
}

/// Resolves a free-text address to coordinates; `Ok(None)` when nothing matches
pub trait Geocoder {
    fn geocode(&self, query: &str) -> impl Future<Output = AppResult<Option<Coordinates>>> + Send;
}

/// Driving distance between two points, in kilometres
pub trait RouteService {
    fn driving_distance_km(
        &self,
        from: Coordinates,
        to: Coordinates,
    ) -> impl Future<Output = AppResult<f64>> + Send;
}

/// Web search returning the raw text of the result page
pub trait MarketSearch {
    fn search(&self, query: &str) -> impl Future<Output = AppResult<String>> + Send;
}

impl<T: Geocoder + Sync> Geocoder for &T {
    fn geocode(&self, query: &str) -> impl Future<Output = AppResult<Option<Coordinates>>> + Send {
        (**self).geocode(query)
    }
}

impl<T: RouteService + Sync> RouteService for &T {
    fn driving_distance_km(
        &self,
        from: Coordinates,
        to: Coordinates,
    ) -> impl Future<Output = AppResult<f64>> + Send {
        (**self).driving_distance_km(from, to)
    }
}

impl<T: MarketSearch + Sync> MarketSearch for &T {
    fn search(&self, query: &str) -> impl Future<Output = AppResult<String>> + Send {
        (**self).search(query)
    }
}

/// Price and configuration summary scraped for one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketProfile {
    pub ticket_size: String,
    pub configurations: String,
}

impl MarketProfile {
    pub fn from_text(text: &str) -> Self {
        Self {
            ticket_size: market::extract_ticket_size(text),
            configurations: market::extract_configurations(text),
        }
    }

    pub fn search_error() -> Self {
        Self {
            ticket_size: labels::SEARCH_ERROR.to_string(),
            configurations: labels::SEARCH_ERROR.to_string(),
        }
    }
}

/// Query sent to the market search for one property
pub fn market_query(society: &str, locality: &str, city: &str) -> String {
    format!("{society} {locality} {city} 1bhk 2bhk 3bhk 4bhk 5bhk price")
}

/// Distance label like `12.35 km`; whole distances keep one decimal (`3.0 km`)
pub fn distance_label(km: f64) -> String {
    format!("{:?} km", (km * 100.0).round() / 100.0)
}

/// Calculate retry delay with exponential backoff and jitter
pub fn calculate_retry_delay(attempt: u32, config: &EnrichmentConfig) -> u64 {
    let base_delay = config.base_retry_delay_ms as f64;
    let exponential_delay = base_delay * 2.0_f64.powf(attempt.saturating_sub(1) as f64);
    let delay = exponential_delay.min(config.max_retry_delay_ms as f64) as u64;

    let jitter_range = delay / 4;
    if jitter_range == 0 {
        return delay;
    }
    delay + rand::random::<u64>() % jitter_range
}

/// Result of an enrichment pass
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    /// Rows that were fully enriched, in input order
    pub rows: Vec<Row>,
    /// Whether the pass stopped early on cancellation
    pub cancelled: bool,
    /// Calls that ended in a placeholder
    pub failed_calls: usize,
}

struct Location {
    society: String,
    locality: String,
    city: String,
}

/// Sequential enrichment driver over injected collaborators
pub struct Enricher<G, R, M> {
    geocoder: G,
    router: R,
    search: M,
    lookup: Arc<dyn PropertyMetadataLookup>,
    config: EnrichmentConfig,
    call_timeout: Duration,
    breaker: CircuitBreaker,
    last_call: Mutex<Option<Instant>>,
}

impl<G, R, M> Enricher<G, R, M>
where
    G: Geocoder,
    R: RouteService,
    M: MarketSearch,
{
    pub fn new(
        geocoder: G,
        router: R,
        search: M,
        lookup: Arc<dyn PropertyMetadataLookup>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            geocoder,
            router,
            search,
            lookup,
            call_timeout: Duration::from_secs(config.http_timeout_secs),
            breaker: CircuitBreaker::from_config(&config),
            config,
            last_call: Mutex::new(None),
        }
    }

    /// Override the per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Enrich `rows` in order until done or cancelled
    ///
    /// On cancellation the rows finished so far are returned; the row in
    /// progress is dropped.
    pub async fn enrich(
        &self,
        rows: &[Row],
        property_column: &str,
        project: Coordinates,
        cancel: &CancellationToken,
    ) -> EnrichmentOutcome {
        let mut outcome = EnrichmentOutcome {
            rows: Vec::with_capacity(rows.len()),
            cancelled: false,
            failed_calls: 0,
        };

        for (index, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            match self
                .enrich_row(index, row, property_column, project, cancel, &mut outcome.failed_calls)
                .await
            {
                Some(enriched) => outcome.rows.push(enriched),
                None => {
                    outcome.cancelled = true;
                    break;
                }
            }
            debug!(record_index = index, total = rows.len(), "Row enriched");
        }

        if outcome.cancelled {
            warn!(
                completed = outcome.rows.len(),
                total = rows.len(),
                "Enrichment cancelled, returning completed rows"
            );
        } else {
            info!(
                rows = outcome.rows.len(),
                failed_calls = outcome.failed_calls,
                "Enrichment completed"
            );
        }
        outcome
    }

    async fn enrich_row(
        &self,
        index: usize,
        row: &Row,
        property_column: &str,
        project: Coordinates,
        cancel: &CancellationToken,
        failed_calls: &mut usize,
    ) -> Option<Row> {
        let location = self.locate(row, property_column);
        let query = format!("{}, {}, {}", location.society, location.locality, location.city);

        let coordinates = match self
            .call("geocoder", index, cancel, || self.geocoder.geocode(&query))
            .await?
        {
            Some(found) => found,
            None => {
                *failed_calls += 1;
                None
            }
        };

        let distance = match coordinates {
            None => labels::LOCATION_NOT_FOUND.to_string(),
            Some(place) => match self
                .call("router", index, cancel, || {
                    self.router.driving_distance_km(project, place)
                })
                .await?
            {
                Some(km) => distance_label(km),
                None => {
                    *failed_calls += 1;
                    labels::ROUTE_ERROR.to_string()
                }
            },
        };

        let search_query = market_query(&location.society, &location.locality, &location.city);
        let profile = match self
            .call("market_search", index, cancel, || self.search.search(&search_query))
            .await?
        {
            Some(text) => MarketProfile::from_text(&text),
            None => {
                *failed_calls += 1;
                MarketProfile::search_error()
            }
        };

        let mut enriched = row.clone();
        enriched.insert(columns::DISTANCE.to_string(), Value::from(distance));
        enriched.insert(
            columns::TICKET_SIZE.to_string(),
            Value::from(profile.ticket_size),
        );
        enriched.insert(
            columns::CONFIGURATIONS.to_string(),
            Value::from(profile.configurations),
        );
        Some(enriched)
    }

    /// Society, locality and city for a row: row columns first, then the lookup
    fn locate(&self, row: &Row, property_column: &str) -> Location {
        let society = row_text(row, property_column).unwrap_or_default();
        let metadata = self.lookup.lookup(&society);
        let locality = row_text(row, columns::LOCALITY)
            .or_else(|| metadata.as_ref().map(|m| m.locality.clone()))
            .unwrap_or_default();
        let city = row_text(row, columns::CITY)
            .or_else(|| metadata.and_then(|m| m.city))
            .unwrap_or_else(|| self.config.default_city.clone());
        Location {
            society,
            locality,
            city,
        }
    }

    /// Run one collaborator call under pacing, timeout, retries and the breaker
    ///
    /// Outer `None` means cancelled; inner `None` means every attempt failed.
    async fn call<T, F, Fut>(
        &self,
        collaborator: &str,
        index: usize,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Option<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if self.breaker.is_open() {
            debug!(collaborator = %collaborator, record_index = index, "Circuit breaker open, skipping call");
            return Some(None);
        }

        let span = observability::enrichment_span(collaborator, index);
        let mut last_error = AppError::Internal("no attempt made".to_string());

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(calculate_retry_delay(attempt, &self.config));
                if !self.wait(delay, cancel).await {
                    return None;
                }
            }
            if !self.pace(cancel).await {
                return None;
            }

            let start_time = Instant::now();
            let result = tokio::time::timeout(self.call_timeout, operation())
                .instrument(span.clone())
                .await;
            *self.last_call.lock() = Some(Instant::now());

            match result {
                Ok(Ok(value)) => {
                    observability::record_enrichment_metrics(collaborator, true, start_time.elapsed());
                    self.breaker.record_success();
                    return Some(Some(value));
                }
                Ok(Err(e)) => last_error = e,
                Err(_) => {
                    last_error = AppError::Network(format!(
                        "{} timed out after {}ms",
                        collaborator,
                        self.call_timeout.as_millis()
                    ))
                }
            }
            observability::record_enrichment_metrics(collaborator, false, start_time.elapsed());
            error_logging::log_network_error(&last_error, collaborator, None, Some(attempt + 1));
        }

        self.breaker.record_failure();
        error_logging::log_collaborator_fallback(&last_error, collaborator, index, "placeholder");
        Some(None)
    }

    /// Hold off until the minimum delay since the previous call has passed
    async fn pace(&self, cancel: &CancellationToken) -> bool {
        let min_delay = Duration::from_millis(self.config.min_call_delay_ms);
        let last_call = *self.last_call.lock();
        match last_call {
            Some(at) => self.wait(min_delay.saturating_sub(at.elapsed()), cancel).await,
            None => !cancel.is_cancelled(),
        }
    }

    /// Sleep unless cancelled first; `false` on cancellation
    async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

fn row_text(row: &Row, column: &str) -> Option<String> {
    row.iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(column))
        .map(|(_, value)| value_to_text(value).trim().to_string())
        .filter(|text| !text.is_empty())
}

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OSRM_ROUTE_URL: &str = "http://router.project-osrm.org/route/v1/driving";
const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Metres
    distance: f64,
}

/// Public OpenStreetMap services over HTTP
#[derive(Debug, Clone)]
pub struct HttpCollaborators {
    client: reqwest::Client,
}

impl HttpCollaborators {
    pub fn new(config: &EnrichmentConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Project coordinates from a map link, following short links first
    pub async fn resolve_project(&self, url: &str) -> AppResult<Option<Coordinates>> {
        let resolved = if market::needs_redirect(url) {
            let response = self.client.get(url).send().await.map_err(|e| {
                error_logging::log_network_error(&e, "resolve_project_link", Some(url), None);
                AppError::from(e)
            })?;
            response.url().to_string()
        } else {
            url.to_string()
        };
        Ok(market::extract_coordinates(&resolved))
    }
}

impl Geocoder for HttpCollaborators {
    async fn geocode(&self, query: &str) -> AppResult<Option<Coordinates>> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(NOMINATIM_URL)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(places.first().and_then(|place| {
            let latitude = place.lat.parse().ok()?;
            let longitude = place.lon.parse().ok()?;
            Some(Coordinates::new(latitude, longitude))
        }))
    }
}

impl RouteService for HttpCollaborators {
    async fn driving_distance_km(&self, from: Coordinates, to: Coordinates) -> AppResult<f64> {
        let url = format!(
            "{}/{},{};{},{}",
            OSRM_ROUTE_URL, from.longitude, from.latitude, to.longitude, to.latitude
        );
        let response: OsrmResponse = self
            .client
            .get(&url)
            .query(&[("overview", "false")])
            .send()
            .await?
            .json()
            .await?;

        match response.routes.first() {
            Some(route) if response.code == "Ok" => Ok(route.distance / 1000.0),
            _ => Err(AppError::Network(format!(
                "Routing service returned code {}",
                response.code
            ))),
        }
    }
}

impl MarketSearch for HttpCollaborators {
    async fn search(&self, query: &str) -> AppResult<String> {
        let body = self
            .client
            .get(DUCKDUCKGO_URL)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .query(&[("q", query)])
            .send()
            .await?
            .text()
            .await?;
        Ok(body)
    }
}
