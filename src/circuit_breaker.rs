//! # Circuit Breaker Module
//!
//! Stops calling an external collaborator after repeated failures so a dead
//! service costs one placeholder per record instead of one timeout per record.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::config::EnrichmentConfig;
use crate::observability;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for enrichment calls
///
/// ```text
/// CLOSED ────failures ≥ threshold────► OPEN
///    ▲                                   │
///    └──────────reset timeout────────────┘
/// ```
///
/// After the reset timeout the counters clear and the next call is let through.
/// A success at any time closes the breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold,
            reset_timeout,
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self::new(
            config.circuit_breaker_threshold,
            Duration::from_secs(config.circuit_breaker_reset_secs),
        )
    }

    /// Check if circuit breaker is open (blocking requests)
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();
        if state.failure_count >= self.threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < self.reset_timeout {
                    return true;
                }
                *state = BreakerState::default();
                observability::update_circuit_breaker_state(false);
            }
        }
        false
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
        if state.failure_count == self.threshold {
            tracing::warn!(
                failures = state.failure_count,
                reset_secs = self.reset_timeout.as_secs(),
                "Circuit breaker opened"
            );
            observability::update_circuit_breaker_state(true);
        }
    }

    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}
