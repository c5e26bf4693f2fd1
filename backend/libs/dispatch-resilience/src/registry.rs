/// Per-dependency circuit breakers, created on first use
///
/// Each breaker keeps its own lock; the map only hands out handles, so a
/// failing dependency never contends with a healthy one.
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct BreakerRegistry {
    default_config: CircuitBreakerConfig,
    breakers: Arc<DashMap<String, CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            default_config,
            breakers: Arc::new(DashMap::new()),
        }
    }

    /// Handle to the breaker guarding `dependency`, created with the default config
    pub fn breaker(&self, dependency: &str) -> CircuitBreaker {
        if let Some(existing) = self.breakers.get(dependency) {
            return existing.value().clone();
        }

        self.breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                debug!(dependency = %dependency, "Creating circuit breaker");
                CircuitBreaker::new(self.default_config.clone()).with_name(dependency)
            })
            .value()
            .clone()
    }

    /// Install a breaker with its own config, replacing any existing one
    pub fn register(&self, dependency: &str, config: CircuitBreakerConfig) -> CircuitBreaker {
        let breaker = CircuitBreaker::new(config).with_name(dependency);
        self.breakers.insert(dependency.to_string(), breaker.clone());
        breaker
    }

    pub fn allow_request(&self, dependency: &str, now_ms: i64) -> bool {
        self.breaker(dependency).allow_request(now_ms)
    }

    pub fn record_result(&self, dependency: &str, success: bool, now_ms: i64) {
        self.breaker(dependency).record_result(success, now_ms);
    }

    /// Dependencies whose breaker is not Closed, sorted by name
    pub fn open_dependencies(&self) -> Vec<String> {
        let mut open: Vec<String> = self
            .breakers
            .iter()
            .filter(|entry| entry.value().state() != CircuitState::Closed)
            .map(|entry| entry.key().clone())
            .collect();
        open.sort();
        open
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
