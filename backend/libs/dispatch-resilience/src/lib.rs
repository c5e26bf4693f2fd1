//! Resilience and idempotent-replay core for the dispatch control plane
//!
//! This library is a pure decision and state layer. It performs no I/O, reads
//! no clock and spawns no tasks; every timestamp is a caller-supplied
//! millisecond value. It provides:
//! - **Circuit Breaker**: closed/open/half-open breaker with bounded probing
//! - **Retry Coordinator**: capped exponential backoff state machine
//! - **Cascade Detector**: sliding-window upstream → downstream failure correlation
//! - **Failover Selector**: picks the best healthy, under-loaded instance
//! - **Load Shedder**: greedy selection of the cheapest work to drop
//! - **Replay Engine**: exactly-once, order-independent event replay
//! - **Preset Configurations**: pre-tuned settings for dispatch dependencies
//!
//! # Example: Guarding a dependency
//!
//! ```rust
//! use dispatch_resilience::{presets, CircuitBreaker};
//!
//! let config = presets::market_gateway_config();
//! let breaker = CircuitBreaker::new(config.circuit_breaker).with_name("market-gateway");
//!
//! let now_ms = 1_000;
//! if breaker.allow_request(now_ms) {
//!     // Issue the call, then report how it went
//!     breaker.record_result(true, now_ms);
//! }
//! ```
//!
//! # Example: Rebuilding state at startup
//!
//! ```rust
//! use dispatch_resilience::{replay, DispatchEvent, DispatchState};
//!
//! let events = vec![
//!     DispatchEvent::new(6, "a").with_delta("generation_mw", 10.0),
//!     DispatchEvent::new(6, "a").with_delta("generation_mw", 10.0),
//!     DispatchEvent::new(4, "b").with_delta("generation_mw", 100.0),
//! ];
//!
//! let snapshot = replay(&DispatchState::new(), 5, &events);
//! assert_eq!(snapshot.version, 6);
//! assert_eq!(snapshot.applied_count, 1);
//! assert_eq!(snapshot.total("generation_mw"), 10.0);
//! ```

pub mod cascade;
pub mod circuit_breaker;
mod clamp;
pub mod failover;
pub mod metrics;
pub mod presets;
pub mod registry;
pub mod replay;
pub mod retry;
pub mod shedding;

// Re-export main types for convenience
pub use cascade::{CascadeConfig, CascadeDetector};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerSnapshot,
    CircuitState,
};
pub use failover::{select_failover, FailoverCandidate};
pub use presets::{
    dispatch_store_config, market_gateway_config, peer_controller_config, telemetry_feed_config,
    ServiceConfig,
};
pub use registry::BreakerRegistry;
pub use replay::{
    decode_event_log, encode_event_log, replay, replay_with_stats, DispatchEvent,
    DispatchSnapshot, DispatchState, ReplayError, ReplayResult, ReplayStats,
};
pub use retry::{RetryConfig, RetryCoordinator};
pub use shedding::{select_sheddable, SheddableItem};
