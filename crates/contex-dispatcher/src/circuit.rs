//! Per-destination-URL circuit breaker. State machine and manager shape
//! grounded directly on
//! `bravo1goingdark-ucfp/crates/semantic/src/resilience/circuit_breaker.rs`
//! (`CircuitState::{Closed,Open,HalfOpen}`, `allow_request`/`record_success`/
//! `record_failure`, a `get_or_create`-keyed manager), generalized here from
//! "per-provider" to "per-destination-URL" keying, with threshold/cooldown
//! sourced from configuration instead of hardcoded.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "open" => Self::Open,
            "half_open" => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<CircuitState>,
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            state: Mutex::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// Restore from a persisted row (dispatcher restart).
    pub fn restore(failure_threshold: u32, cooldown: Duration, state: CircuitState, consecutive_failures: u32) -> Self {
        let breaker = Self::new(failure_threshold, cooldown);
        *breaker.state.lock().unwrap() = state;
        breaker.consecutive_failures.store(consecutive_failures, Ordering::Relaxed);
        if state == CircuitState::Open {
            *breaker.opened_at.lock().unwrap() = Some(Instant::now());
        }
        breaker
    }

    pub fn allow_request(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.opened_at.lock().unwrap().map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    *state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *state = CircuitState::Closed;
        *self.opened_at.lock().unwrap() = None;
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.lock().unwrap();
        match *state {
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                *self.opened_at.lock().unwrap() = Some(Instant::now());
            }
            CircuitState::Closed => {
                if failures >= self.failure_threshold {
                    *state = CircuitState::Open;
                    *self.opened_at.lock().unwrap() = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn current_state(&self) -> CircuitState {
        *self.state.lock().unwrap()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }
}

pub struct CircuitBreakerManager {
    breakers: DashMap<String, std::sync::Arc<CircuitBreaker>>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreakerManager {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self { breakers: DashMap::new(), failure_threshold, cooldown }
    }

    pub fn get_or_create(&self, url: &str) -> std::sync::Arc<CircuitBreaker> {
        self.breakers
            .entry(url.to_string())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(self.failure_threshold, self.cooldown)))
            .clone()
    }

    pub fn restore_one(&self, url: &str, state: CircuitState, consecutive_failures: u32) {
        self.breakers.insert(
            url.to_string(),
            std::sync::Arc::new(CircuitBreaker::restore(self.failure_threshold, self.cooldown, state, consecutive_failures)),
        );
    }

    pub fn snapshot(&self) -> Vec<(String, CircuitState, u32)> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().current_state(), entry.value().consecutive_failures()))
            .collect()
    }
}
