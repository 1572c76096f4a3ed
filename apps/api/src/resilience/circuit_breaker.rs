//! Circuit Breaker — closed / open / half-open state machine around a provider.
//!
//! - closed → open after `failure_threshold` consecutive failures
//! - open → half_open once `recovery_timeout` has elapsed since opening
//! - half_open → closed after `half_open_successes` consecutive successes
//! - half_open → open on any failure
//!
//! Breakers live in a `BreakerRegistry`, one per provider name, created on first use.
//! Timing uses `tokio::time::Instant` so recovery can be driven by a paused test clock.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Error)]
pub enum CircuitError<E> {
    #[error("circuit breaker '{name}' is open; retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    #[error("{0}")]
    Inner(E),
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_successes: u32,
    pub enabled: bool,
}

impl From<&CoreConfig> for BreakerSettings {
    fn from(config: &CoreConfig) -> Self {
        Self {
            failure_threshold: config.cb_failure_threshold.max(1),
            recovery_timeout: config.cb_recovery_timeout,
            half_open_successes: config.cb_half_open_requests.max(1),
            enabled: config.enable_circuit_breaker,
        }
    }
}

/// Monitoring snapshot of a single breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub consecutive_failures: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
}

struct BreakerInner {
    state: CircuitState,
    last_state_change: Instant,
    half_open_successes: u32,
    total_calls: u64,
    successful_calls: u64,
    failed_calls: u64,
    rejected_calls: u64,
    consecutive_failures: u32,
    last_failure_time: Option<DateTime<Utc>>,
    last_success_time: Option<DateTime<Utc>>,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            last_state_change: Instant::now(),
            half_open_successes: 0,
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            rejected_calls: 0,
            consecutive_failures: 0,
            last_failure_time: None,
            last_success_time: None,
        }
    }

    fn transition(&mut self, state: CircuitState) {
        self.state = state;
        self.last_state_change = Instant::now();
        self.half_open_successes = 0;
    }
}

pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Runs `op` through the breaker. Rejected calls never invoke `op`.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if !self.settings.enabled {
            return op().await.map_err(CircuitError::Inner);
        }

        if let Err(retry_in) = self.admit() {
            return Err(CircuitError::Open {
                name: self.name.clone(),
                retry_in,
            });
        }

        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(CircuitError::Inner(e))
            }
        }
    }

    /// Decides whether a call may proceed, moving open → half_open when the
    /// recovery timeout has elapsed. Rejections are counted here.
    fn admit(&self) -> Result<(), Duration> {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.last_state_change.elapsed();
                if elapsed >= self.settings.recovery_timeout {
                    inner.transition(CircuitState::HalfOpen);
                    info!("Circuit breaker '{}' transitioned to HALF_OPEN", self.name);
                    Ok(())
                } else {
                    inner.total_calls += 1;
                    inner.rejected_calls += 1;
                    Err(self.settings.recovery_timeout - elapsed)
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.total_calls += 1;
        inner.successful_calls += 1;
        inner.consecutive_failures = 0;
        inner.last_success_time = Some(Utc::now());

        if inner.state == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.settings.half_open_successes {
                inner.transition(CircuitState::Closed);
                info!("Circuit breaker '{}' CLOSED after successful recovery", self.name);
            }
        }
    }

    fn record_failure(&self, error: &dyn Display) {
        let mut inner = self.lock();
        inner.total_calls += 1;
        inner.failed_calls += 1;
        inner.consecutive_failures += 1;
        inner.last_failure_time = Some(Utc::now());

        let state = inner.state;
        match state {
            CircuitState::HalfOpen => {
                inner.transition(CircuitState::Open);
                warn!(
                    "Circuit breaker '{}' OPENED after half-open failure: {error}",
                    self.name
                );
            }
            CircuitState::Closed
                if inner.consecutive_failures >= self.settings.failure_threshold =>
            {
                inner.transition(CircuitState::Open);
                warn!(
                    "Circuit breaker '{}' OPENED after {} consecutive failures: {error}",
                    self.name, inner.consecutive_failures
                );
            }
            _ => {}
        }
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.lock();
        BreakerStats {
            name: self.name.clone(),
            state: inner.state,
            total_calls: inner.total_calls,
            successful_calls: inner.successful_calls,
            failed_calls: inner.failed_calls,
            rejected_calls: inner.rejected_calls,
            consecutive_failures: inner.consecutive_failures,
            last_failure_time: inner.last_failure_time,
            last_success_time: inner.last_success_time,
        }
    }

    /// Manually resets the breaker to closed with fresh counters.
    pub fn reset(&self) {
        *self.lock() = BreakerInner::new();
        info!("Circuit breaker '{}' manually reset to CLOSED", self.name);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-lifetime registry of breakers keyed by provider name.
pub struct BreakerRegistry {
    settings: BreakerSettings,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Created circuit breaker for service: {name}");
                Arc::new(CircuitBreaker::new(name, self.settings))
            })
            .clone()
    }

    /// Stats for every breaker created so far, sorted by name.
    pub fn all_stats(&self) -> Vec<BreakerStats> {
        let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats: Vec<BreakerStats> = breakers.values().map(|b| b.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}
