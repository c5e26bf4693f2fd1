/// Prometheus metrics for dispatch resilience decisions
#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;

#[cfg(feature = "metrics")]
static BREAKER_STATE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dispatch_breaker_state_transitions_total",
        "Total number of circuit breaker state transitions",
        &["dependency", "from", "to"]
    )
    .expect("Failed to register breaker state transitions metric")
});

#[cfg(feature = "metrics")]
static BREAKER_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dispatch_breaker_rejections_total",
        "Total number of requests rejected by an open or saturated breaker",
        &["dependency"]
    )
    .expect("Failed to register breaker rejections metric")
});

#[cfg(feature = "metrics")]
static CASCADE_DETECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dispatch_cascade_detections_total",
        "Total number of cascade detections per dependency edge",
        &["upstream", "downstream"]
    )
    .expect("Failed to register cascade detections metric")
});

#[cfg(feature = "metrics")]
static FAILOVER_SELECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dispatch_failover_selections_total",
        "Total number of failover selections",
        &["result"]
    )
    .expect("Failed to register failover selections metric")
});

#[cfg(feature = "metrics")]
static SHED_ITEMS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dispatch_shed_items_total",
        "Total number of work items selected for shedding"
    )
    .expect("Failed to register shed items metric")
});

#[cfg(feature = "metrics")]
static REPLAY_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dispatch_replay_events_total",
        "Total number of replayed events by outcome",
        &["outcome"]
    )
    .expect("Failed to register replay events metric")
});

/// Metrics collector for circuit breakers
#[cfg(feature = "metrics")]
pub struct BreakerMetrics;

#[cfg(feature = "metrics")]
impl BreakerMetrics {
    pub fn record_state_transition(dependency: &str, from: &str, to: &str) {
        BREAKER_STATE_TRANSITIONS
            .with_label_values(&[dependency, from, to])
            .inc();
    }

    pub fn record_rejection(dependency: &str) {
        BREAKER_REJECTIONS.with_label_values(&[dependency]).inc();
    }
}

/// Metrics collector for cascade detection
#[cfg(feature = "metrics")]
pub struct CascadeMetrics;

#[cfg(feature = "metrics")]
impl CascadeMetrics {
    pub fn record_detection(upstream: &str, downstream: &str) {
        CASCADE_DETECTIONS
            .with_label_values(&[upstream, downstream])
            .inc();
    }
}

/// Metrics collector for failover and shedding decisions
#[cfg(feature = "metrics")]
pub struct DecisionMetrics;

#[cfg(feature = "metrics")]
impl DecisionMetrics {
    pub fn record_failover(result: &str) {
        FAILOVER_SELECTIONS.with_label_values(&[result]).inc();
    }

    pub fn record_shed(items: usize) {
        SHED_ITEMS.inc_by(items as u64);
    }
}

/// Metrics collector for replay
#[cfg(feature = "metrics")]
pub struct ReplayMetrics;

#[cfg(feature = "metrics")]
impl ReplayMetrics {
    pub fn record_events(outcome: &str, count: u64) {
        REPLAY_EVENTS.with_label_values(&[outcome]).inc_by(count);
    }
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub struct BreakerMetrics;

#[cfg(not(feature = "metrics"))]
impl BreakerMetrics {
    pub fn record_state_transition(_dependency: &str, _from: &str, _to: &str) {}
    pub fn record_rejection(_dependency: &str) {}
}

#[cfg(not(feature = "metrics"))]
pub struct CascadeMetrics;

#[cfg(not(feature = "metrics"))]
impl CascadeMetrics {
    pub fn record_detection(_upstream: &str, _downstream: &str) {}
}

#[cfg(not(feature = "metrics"))]
pub struct DecisionMetrics;

#[cfg(not(feature = "metrics"))]
impl DecisionMetrics {
    pub fn record_failover(_result: &str) {}
    pub fn record_shed(_items: usize) {}
}

#[cfg(not(feature = "metrics"))]
pub struct ReplayMetrics;

#[cfg(not(feature = "metrics"))]
impl ReplayMetrics {
    pub fn record_events(_outcome: &str, _count: u64) {}
}
