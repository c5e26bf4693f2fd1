/// Preset configurations for typical dispatch-plane dependencies
use crate::cascade::CascadeConfig;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};

/// Configuration bundle for one dependency edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: Option<RetryConfig>,
    pub cascade: CascadeConfig,
}

/// Telemetry feeds (meter readings, SCADA points)
///
/// - Circuit breaker: 5 failures, 2 probes, 15s cooldown
/// - Retry: 4 attempts from 50ms (reads are idempotent)
/// - Cascade window: 30s
pub fn telemetry_feed_config() -> ServiceConfig {
    ServiceConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 5,
            probe_limit: 2,
            reset_timeout_ms: 15_000,
        },
        retry: Some(RetryConfig {
            max_attempts: 4,
            base_backoff_ms: 50,
        }),
        cascade: CascadeConfig {
            window_ms: 30_000,
            threshold_ratio: 0.5,
        },
    }
}

/// Market and pricing gateways (external, slow to recover)
///
/// - Circuit breaker: 5 failures, 3 probes, 120s cooldown
/// - Retry: 3 attempts from 500ms
pub fn market_gateway_config() -> ServiceConfig {
    ServiceConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 5,
            probe_limit: 3,
            reset_timeout_ms: 120_000,
        },
        retry: Some(RetryConfig {
            max_attempts: 3,
            base_backoff_ms: 500,
        }),
        cascade: CascadeConfig {
            window_ms: 120_000,
            threshold_ratio: 0.75,
        },
    }
}

/// Dispatch state store
///
/// - Circuit breaker: 10 failures, 3 probes, 30s cooldown
/// - No retry (avoid duplicate writes; replay reconciles instead)
pub fn dispatch_store_config() -> ServiceConfig {
    ServiceConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 10,
            probe_limit: 3,
            reset_timeout_ms: 30_000,
        },
        retry: None,
        cascade: CascadeConfig {
            window_ms: 60_000,
            threshold_ratio: 0.5,
        },
    }
}

/// Peer dispatch controllers
///
/// - Circuit breaker: 3 failures, 1 probe, 10s cooldown
/// - Retry: 2 attempts from 100ms
pub fn peer_controller_config() -> ServiceConfig {
    ServiceConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            probe_limit: 1,
            reset_timeout_ms: 10_000,
        },
        retry: Some(RetryConfig {
            max_attempts: 2,
            base_backoff_ms: 100,
        }),
        cascade: CascadeConfig {
            window_ms: 20_000,
            threshold_ratio: 0.5,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_feed_config() {
        let config = telemetry_feed_config();
        assert_eq!(config.circuit_breaker.reset_timeout_ms, 15_000);
        assert!(config.retry.is_some());
    }

    #[test]
    fn test_market_gateway_config() {
        let config = market_gateway_config();
        assert_eq!(config.circuit_breaker.probe_limit, 3);
        assert_eq!(config.retry.map(|r| r.base_backoff_ms), Some(500));
    }

    #[test]
    fn test_dispatch_store_config() {
        let config = dispatch_store_config();
        assert_eq!(config.circuit_breaker.failure_threshold, 10);
        assert!(config.retry.is_none()); // No retry for store writes
    }

    #[test]
    fn test_peer_controller_config() {
        let config = peer_controller_config();
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert!(config.retry.is_some());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"circuit_breaker":{"failure_threshold":7},"retry":{"max_attempts":9}}"#,
        )
        .unwrap();

        assert_eq!(config.circuit_breaker.failure_threshold, 7);
        assert_eq!(
            config.circuit_breaker.reset_timeout_ms,
            CircuitBreakerConfig::default().reset_timeout_ms
        );
        assert_eq!(config.retry.as_ref().map(|r| r.max_attempts), Some(9));
        assert_eq!(config.retry.map(|r| r.base_backoff_ms), Some(100));
        assert_eq!(config.cascade, CascadeConfig::default());
    }
}
