//! Circuit breaker around external capability calls (§9 supplemented
//! feature B.1), scoped by capability (LLM tier, search provider,
//! fetcher) rather than by task chain/agent/operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::SubstrateError;
use crate::domain::models::ModelTier;

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
    pub success_threshold: u32,
    pub failure_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
            success_threshold: 2,
            failure_window: Duration::from_secs(600),
        }
    }
}

/// What capability a circuit guards: a persistently-failing provider
/// tier is what must stop being hammered mid-mission (§9 B.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CircuitScope {
    LlmTier(ModelTier),
    Searcher(String),
    Fetcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
struct FailureRecord {
    at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Circuit {
    state: CircuitState,
    failures: Vec<FailureRecord>,
    half_open_successes: u32,
    opened_at: Option<DateTime<Utc>>,
}

impl Circuit {
    fn new() -> Self {
        Self { state: CircuitState::Closed, failures: Vec::new(), half_open_successes: 0, opened_at: None }
    }

    fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        self.failures.push(FailureRecord { at: Utc::now() });
        let cutoff = Utc::now() - chrono::Duration::from_std(config.failure_window).unwrap_or_default();
        self.failures.retain(|f| f.at > cutoff);

        if self.state == CircuitState::HalfOpen {
            self.open();
        } else if self.state == CircuitState::Closed && self.failures.len() as u32 >= config.failure_threshold {
            self.open();
        }
    }

    fn record_success(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::HalfOpen {
            self.half_open_successes += 1;
            if self.half_open_successes >= config.success_threshold {
                self.close();
            }
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Utc::now());
        self.half_open_successes = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.half_open_successes = 0;
        self.failures.clear();
    }

    fn allows(&mut self, config: &CircuitBreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let Some(opened_at) = self.opened_at else { return true };
                if Utc::now() > opened_at + chrono::Duration::from_std(config.open_timeout).unwrap_or_default() {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Registry of per-scope circuit breakers shared across a mission's agents.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    circuits: RwLock<HashMap<CircuitScope, Circuit>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self { config, circuits: RwLock::new(HashMap::new()) })
    }

    /// Runs `operation` through the circuit for `scope`: short-circuits to
    /// `Transient` when the circuit is open, without a network round trip.
    pub async fn call<F, Fut, T>(&self, scope: CircuitScope, operation: F) -> Result<T, SubstrateError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, SubstrateError>>,
    {
        {
            let mut circuits = self.circuits.write().await;
            let circuit = circuits.entry(scope.clone()).or_insert_with(Circuit::new);
            if !circuit.allows(&self.config) {
                return Err(SubstrateError::Transient(format!("circuit open for {scope:?}")));
            }
        }

        let result = operation().await;

        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(scope).or_insert_with(Circuit::new);
        match &result {
            Ok(_) => circuit.record_success(&self.config),
            Err(e) if e.is_transient() => circuit.record_failure(&self.config),
            Err(_) => {}
        }
        result
    }

    pub async fn state(&self, scope: &CircuitScope) -> CircuitState {
        self.circuits.read().await.get(scope).map_or(CircuitState::Closed, |c| c.state)
    }
}
