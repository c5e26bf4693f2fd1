/// Sliding-window cascading-failure detection across service pairs
///
/// Errors are appended per service. Queries count the errors with
/// `now_ms - ts <= window_ms` and drop expired timestamps as they go; a write
/// also prunes its own service once the oldest entry has expired, so logs of
/// services that are never queried stay bounded by the window. Detection is
/// point-in-time: callers poll `detect_cascade` on a timer or on each new error.
/// `clear` drops a service outright.
use crate::clamp::{non_negative_ms, non_negative_ratio};
use crate::metrics::CascadeMetrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Width of the error window
    pub window_ms: i64,
    /// Downstream/upstream error ratio above which a cascade is reported
    pub threshold_ratio: f64,
}

impl CascadeConfig {
    pub fn new(window_ms: i64, threshold_ratio: f64) -> Self {
        Self {
            window_ms,
            threshold_ratio,
        }
    }

    fn normalized(self) -> Self {
        Self {
            window_ms: non_negative_ms(self.window_ms),
            threshold_ratio: non_negative_ratio(self.threshold_ratio),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            threshold_ratio: 0.5,
        }
    }
}

#[derive(Clone)]
pub struct CascadeDetector {
    config: CascadeConfig,
    errors: Arc<Mutex<HashMap<String, VecDeque<i64>>>>,
}

impl CascadeDetector {
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            config: config.normalized(),
            errors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn record_error(&self, service: &str, ts_ms: i64) {
        let mut errors = self.errors.lock();
        let Some(log) = errors.get_mut(service) else {
            errors.insert(service.to_string(), VecDeque::from([ts_ms]));
            return;
        };

        let window_ms = self.config.window_ms;
        if log
            .front()
            .is_some_and(|&oldest| ts_ms.saturating_sub(oldest) > window_ms)
        {
            log.retain(|&ts| ts_ms.saturating_sub(ts) <= window_ms);
        }
        log.push_back(ts_ms);
    }

    /// Errors recorded for `service` inside the window ending at `now_ms`
    pub fn error_count(&self, service: &str, now_ms: i64) -> usize {
        let mut errors = self.errors.lock();
        self.count_in_window(&mut errors, service, now_ms)
    }

    /// Downstream/upstream error ratio, `None` without upstream errors
    pub fn cascade_ratio(&self, upstream: &str, downstream: &str, now_ms: i64) -> Option<f64> {
        let mut errors = self.errors.lock();
        let upstream_count = self.count_in_window(&mut errors, upstream, now_ms);
        if upstream_count == 0 {
            return None;
        }
        let downstream_count = self.count_in_window(&mut errors, downstream, now_ms);
        Some(downstream_count as f64 / upstream_count as f64)
    }

    /// Whether upstream failures appear to be driving downstream failures.
    pub fn detect_cascade(&self, upstream: &str, downstream: &str, now_ms: i64) -> bool {
        let Some(ratio) = self.cascade_ratio(upstream, downstream, now_ms) else {
            return false;
        };

        let detected = ratio > self.config.threshold_ratio;
        if detected {
            warn!(
                upstream = %upstream,
                downstream = %downstream,
                ratio,
                threshold = self.config.threshold_ratio,
                "Cascading failure detected"
            );
            CascadeMetrics::record_detection(upstream, downstream);
        }
        detected
    }

    /// Forget every error recorded for `service`
    pub fn clear(&self, service: &str) {
        self.errors.lock().remove(service);
    }

    fn count_in_window(
        &self,
        errors: &mut HashMap<String, VecDeque<i64>>,
        service: &str,
        now_ms: i64,
    ) -> usize {
        let Some(log) = errors.get_mut(service) else {
            return 0;
        };
        // Timestamps may arrive out of order, so prune by value rather than from the front
        let window_ms = self.config.window_ms;
        log.retain(|&ts| now_ms.saturating_sub(ts) <= window_ms);
        log.len()
    }
}

impl Default for CascadeDetector {
    fn default() -> Self {
        Self::new(CascadeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_upstream_errors_means_no_cascade() {
        let detector = CascadeDetector::new(CascadeConfig::new(1_000, 0.0));
        for ts in 0..50 {
            detector.record_error("dispatch-api", ts);
        }
        assert!(!detector.detect_cascade("market-feed", "dispatch-api", 100));
        assert_eq!(detector.cascade_ratio("market-feed", "dispatch-api", 100), None);
    }

    #[test]
    fn test_ratio_above_threshold_is_cascade() {
        let detector = CascadeDetector::new(CascadeConfig::new(1_000, 1.5));
        detector.record_error("market-feed", 100);
        detector.record_error("market-feed", 200);
        for ts in [150, 250, 350, 450] {
            detector.record_error("dispatch-api", ts);
        }

        assert_eq!(detector.cascade_ratio("market-feed", "dispatch-api", 500), Some(2.0));
        assert!(detector.detect_cascade("market-feed", "dispatch-api", 500));
    }

    #[test]
    fn test_ratio_equal_to_threshold_is_not_cascade() {
        let detector = CascadeDetector::new(CascadeConfig::new(1_000, 1.0));
        detector.record_error("upstream", 10);
        detector.record_error("downstream", 20);
        assert!(!detector.detect_cascade("upstream", "downstream", 30));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let detector = CascadeDetector::new(CascadeConfig::new(100, 0.5));
        detector.record_error("upstream", 0);
        detector.record_error("downstream", 0);

        assert!(detector.detect_cascade("upstream", "downstream", 100));
        assert!(!detector.detect_cascade("upstream", "downstream", 101));
        assert_eq!(detector.error_count("upstream", 101), 0);
    }

    #[test]
    fn test_expired_errors_pruned_out_of_order() {
        let detector = CascadeDetector::new(CascadeConfig::new(100, 0.5));
        detector.record_error("upstream", 500);
        detector.record_error("upstream", 10);
        detector.record_error("upstream", 480);

        assert_eq!(detector.error_count("upstream", 550), 2);
    }

    #[test]
    fn test_unqueried_service_log_stays_bounded() {
        let detector = CascadeDetector::new(CascadeConfig::new(100, 0.5));
        for ts in 0..10_000 {
            detector.record_error("telemetry", ts);
        }

        let retained = detector.errors.lock().get("telemetry").map_or(0, VecDeque::len);
        assert!(retained <= 102, "retained {retained} timestamps");
        assert_eq!(detector.error_count("telemetry", 9_999), 101);
    }

    #[test]
    fn test_clear_forgets_service() {
        let detector = CascadeDetector::default();
        detector.record_error("upstream", 1);
        detector.clear("upstream");
        assert_eq!(detector.error_count("upstream", 1), 0);
    }

    #[test]
    fn test_invalid_config_clamped() {
        let detector = CascadeDetector::new(CascadeConfig::new(-5, f64::NAN));
        assert_eq!(detector.config().window_ms, 0);
        assert_eq!(detector.config().threshold_ratio, 0.0);
    }
}
