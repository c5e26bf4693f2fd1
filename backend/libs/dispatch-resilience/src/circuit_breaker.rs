/// Three-state circuit breaker driven by caller-supplied millisecond timestamps
///
/// State transitions:
/// - Closed → Open: when consecutive failures reach `failure_threshold`
/// - Open → HalfOpen: on the first request or result after `reset_timeout_ms`
/// - HalfOpen: at most `probe_limit` requests are admitted until the verdict
/// - HalfOpen → Closed: when all `probe_limit` probes succeed
/// - HalfOpen → Open: when `probe_limit` probes complete with any failure
///
/// The breaker never reads a clock. Callers must pass a non-decreasing `now_ms`.
use crate::clamp::{at_least_one, non_negative_ms};
use crate::metrics::BreakerMetrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, requests pass through
    Closed,
    /// Dependency assumed down, requests fail fast
    Open,
    /// Recovery suspected, a bounded number of probes pass through
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker (0 is treated as 1)
    pub failure_threshold: u32,
    /// Probes allowed, and required to succeed, while HalfOpen (0 is treated as 1)
    pub probe_limit: u32,
    /// Time to stay Open before probing
    pub reset_timeout_ms: i64,
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, probe_limit: u32, reset_timeout_ms: i64) -> Self {
        Self {
            failure_threshold,
            probe_limit,
            reset_timeout_ms,
        }
    }

    fn normalized(self) -> Self {
        Self {
            failure_threshold: at_least_one(self.failure_threshold),
            probe_limit: at_least_one(self.probe_limit),
            reset_timeout_ms: non_negative_ms(self.reset_timeout_ms),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            probe_limit: 2,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Point-in-time copy of the breaker counters (for monitoring)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub probe_count: u32,
    pub last_failure_at_ms: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError {
    #[error("Circuit breaker is open - failing fast")]
    Open,
    #[error("Call failed: {0}")]
    CallFailed(String),
}

/// Shared handle to one dependency's breaker. Clones observe the same state.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    state: Arc<Mutex<BreakerState>>,
}

struct BreakerState {
    current: CircuitState,
    failure_count: u32,
    success_count: u32,
    probe_count: u32,
    /// Requests let through since entering HalfOpen
    admitted_probes: u32,
    last_failure_at_ms: i64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            name: Arc::from("default"),
            config: config.normalized(),
            state: Arc::new(Mutex::new(BreakerState {
                current: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                probe_count: 0,
                admitted_probes: 0,
                last_failure_at_ms: 0,
            })),
        }
    }

    /// Label used in logs and metrics
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective configuration after clamping
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Whether a request may be sent to the dependency at `now_ms`.
    ///
    /// An Open breaker whose reset timeout has elapsed moves to HalfOpen here,
    /// and this call is admitted as the first probe.
    pub fn allow_request(&self, now_ms: i64) -> bool {
        let mut state = self.state.lock();

        let allowed = match state.current {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.reset_elapsed(&state, now_ms) {
                    self.transition(&mut state, CircuitState::HalfOpen, now_ms);
                    state.admitted_probes = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if state.admitted_probes < self.config.probe_limit {
                    state.admitted_probes += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !allowed {
            debug!(
                dependency = %self.name,
                state = %state.current,
                "Circuit breaker rejected request"
            );
            BreakerMetrics::record_rejection(&self.name);
        }

        allowed
    }

    /// Feed the outcome of one call into the state machine.
    pub fn record_result(&self, success: bool, now_ms: i64) {
        let mut state = self.state.lock();

        match state.current {
            CircuitState::Closed => {
                if success {
                    state.failure_count = 0;
                    return;
                }
                state.failure_count = state.failure_count.saturating_add(1);
                if state.failure_count >= self.config.failure_threshold {
                    self.transition(&mut state, CircuitState::Open, now_ms);
                }
            }
            CircuitState::Open => {
                if !self.reset_elapsed(&state, now_ms) {
                    // Late result from a call admitted before the breaker opened
                    debug!(dependency = %self.name, success, "Ignoring result while open");
                    return;
                }
                self.transition(&mut state, CircuitState::HalfOpen, now_ms);
                self.record_probe(&mut state, success, now_ms);
            }
            CircuitState::HalfOpen => self.record_probe(&mut state, success, now_ms),
        }
    }

    /// Run `f` under breaker protection, recording its outcome at `now_ms`.
    pub fn call<F, T, E>(&self, now_ms: i64, f: F) -> Result<T, CircuitBreakerError>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        if !self.allow_request(now_ms) {
            return Err(CircuitBreakerError::Open);
        }

        match f() {
            Ok(result) => {
                self.record_result(true, now_ms);
                Ok(result)
            }
            Err(e) => {
                self.record_result(false, now_ms);
                Err(CircuitBreakerError::CallFailed(e.to_string()))
            }
        }
    }

    /// Get the stored state. Does not advance Open → HalfOpen.
    pub fn state(&self) -> CircuitState {
        self.state.lock().current
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let state = self.state.lock();
        CircuitBreakerSnapshot {
            state: state.current,
            failure_count: state.failure_count,
            success_count: state.success_count,
            probe_count: state.probe_count,
            last_failure_at_ms: state.last_failure_at_ms,
        }
    }

    fn record_probe(&self, state: &mut BreakerState, success: bool, now_ms: i64) {
        state.probe_count += 1;
        if success {
            state.success_count += 1;
        }

        if state.probe_count < self.config.probe_limit {
            return;
        }

        if state.success_count >= self.config.probe_limit {
            self.transition(state, CircuitState::Closed, now_ms);
        } else {
            self.transition(state, CircuitState::Open, now_ms);
        }
    }

    fn reset_elapsed(&self, state: &BreakerState, now_ms: i64) -> bool {
        now_ms.saturating_sub(state.last_failure_at_ms) >= self.config.reset_timeout_ms
    }

    fn transition(&self, state: &mut BreakerState, to: CircuitState, now_ms: i64) {
        let from = state.current;
        state.current = to;

        match to {
            CircuitState::Open => {
                state.last_failure_at_ms = now_ms;
                warn!(
                    dependency = %self.name,
                    failures = state.failure_count,
                    probes = state.probe_count,
                    successes = state.success_count,
                    "Circuit breaker: {} → {}",
                    from,
                    to
                );
            }
            CircuitState::HalfOpen => {
                state.probe_count = 0;
                state.success_count = 0;
                state.admitted_probes = 0;
                info!(dependency = %self.name, "Circuit breaker: {} → {}", from, to);
            }
            CircuitState::Closed => {
                state.failure_count = 0;
                info!(dependency = %self.name, "Circuit breaker: {} → {}", from, to);
            }
        }

        BreakerMetrics::record_state_transition(&self.name, from.as_str(), to.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, probe_limit: u32, reset_timeout_ms: i64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig::new(
            failure_threshold,
            probe_limit,
            reset_timeout_ms,
        ))
    }

    #[test]
    fn test_opens_on_exact_threshold() {
        let cb = breaker(3, 1, 1_000);

        cb.record_result(false, 10);
        cb.record_result(false, 20);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_result(false, 30);
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().last_failure_at_ms, 30);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(3, 1, 1_000);

        cb.record_result(false, 0);
        cb.record_result(false, 0);
        cb.record_result(true, 0);
        assert_eq!(cb.snapshot().failure_count, 0);

        cb.record_result(false, 0);
        cb.record_result(false, 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_open_rejects_until_timeout() {
        let cb = breaker(1, 1, 500);
        cb.record_result(false, 1_000);

        assert!(!cb.allow_request(1_000));
        assert!(!cb.allow_request(1_499));
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.allow_request(1_500));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_halfopen_limits_probes() {
        let cb = breaker(1, 2, 100);
        cb.record_result(false, 0);

        assert!(cb.allow_request(100));
        cb.record_result(true, 101);
        assert!(cb.allow_request(102));
        assert_eq!(cb.snapshot().probe_count, 1);
    }

    #[test]
    fn test_halfopen_admits_at_most_probe_limit_before_results() {
        let cb = breaker(1, 1, 100);
        cb.record_result(false, 0);

        let admitted = (0..50).filter(|_| cb.allow_request(200)).count();
        assert_eq!(admitted, 1);
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let cb = breaker(1, 3, 100);
        cb.record_result(false, 0);
        let admitted = (0..10).filter(|_| cb.allow_request(100)).count();
        assert_eq!(admitted, 3);

        // A completed round resets the admission budget
        for _ in 0..3 {
            cb.record_result(false, 110);
        }
        assert_eq!(cb.state(), CircuitState::Open);
        let admitted = (0..10).filter(|_| cb.allow_request(210)).count();
        assert_eq!(admitted, 3);
    }

    #[test]
    fn test_halfopen_to_closed_when_all_probes_succeed() {
        let cb = breaker(1, 2, 100);
        cb.record_result(false, 0);

        assert!(cb.allow_request(100));
        cb.record_result(true, 100);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_result(true, 101);

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
    }

    #[test]
    fn test_halfopen_to_open_when_a_probe_fails() {
        let cb = breaker(1, 2, 100);
        cb.record_result(false, 0);

        assert!(cb.allow_request(100));
        cb.record_result(false, 100);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_result(true, 105);

        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().last_failure_at_ms, 105);
        assert!(!cb.allow_request(150));
    }

    #[test]
    fn test_result_after_timeout_enters_halfopen() {
        let cb = breaker(1, 1, 100);
        cb.record_result(false, 0);

        cb.record_result(true, 200);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_result_while_open_is_ignored() {
        let cb = breaker(1, 1, 100);
        cb.record_result(false, 0);

        cb.record_result(true, 50);
        cb.record_result(false, 60);

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.last_failure_at_ms, 0);
    }

    #[test]
    fn test_zero_thresholds_are_clamped() {
        let cb = breaker(0, 0, -10);
        assert_eq!(cb.config().failure_threshold, 1);
        assert_eq!(cb.config().probe_limit, 1);
        assert_eq!(cb.config().reset_timeout_ms, 0);

        cb.record_result(false, 5);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.allow_request(5));
        cb.record_result(true, 5);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_call_rejects_when_open() {
        let cb = breaker(2, 1, 10_000);

        for _ in 0..2 {
            let result = cb.call(0, || Err::<(), _>("error"));
            assert!(matches!(result, Err(CircuitBreakerError::CallFailed(_))));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb.call(1, || Ok::<_, String>(()));
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[test]
    fn test_call_passes_value_through() {
        let cb = breaker(2, 1, 10_000);
        let result = cb.call(0, || Ok::<_, String>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_clones_share_state() {
        let cb = breaker(2, 1, 1_000).with_name("market-gateway");
        let handle = cb.clone();

        cb.record_result(false, 0);
        handle.record_result(false, 0);

        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(handle.name(), "market-gateway");
    }
}
