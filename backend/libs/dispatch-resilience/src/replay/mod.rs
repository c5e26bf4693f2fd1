//! Idempotent, version-ordered event replay
//!
//! Rebuilds a dispatch snapshot from a base state plus an event log that may
//! deliver events out of order or more than once. Each logical mutation is
//! applied exactly once and the result does not depend on input order.
//!
//! ```text
//! events ──sort (version, key)──► skip stale ──► skip seen key ──► apply
//! ```
//!
//! An event is skipped when:
//! - its `idempotency_key` was already applied during this replay (duplicate),
//! - its `version` is not above the snapshot version (stale).
//!
//! A well-formed log never carries two different payloads under one
//! `(version, idempotency_key)` pair. If it does, the stable sort keeps input
//! order for the tie and the first payload wins.
//!
//! Callers replaying while the resource is live must hold their own write lock
//! for the duration of the call.

use crate::metrics::ReplayMetrics;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

pub mod codec;
mod error;

pub use codec::{decode_event_log, encode_event_log};
pub use error::{ReplayError, ReplayResult};

/// Named numeric totals, e.g. `generation_mw`
pub type DispatchState = BTreeMap<String, f64>;

/// One logged mutation of a dispatch resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    /// Per-resource sequence number assigned by the writer
    pub version: i64,
    /// Unique per logical mutation, repeated on redelivery
    pub idempotency_key: String,
    #[serde(default)]
    pub deltas: BTreeMap<String, f64>,
}

impl DispatchEvent {
    pub fn new(version: i64, idempotency_key: impl Into<String>) -> Self {
        Self {
            version,
            idempotency_key: idempotency_key.into(),
            deltas: BTreeMap::new(),
        }
    }

    /// Add `value` to the delta for `name`
    pub fn with_delta(mut self, name: impl Into<String>, value: f64) -> Self {
        *self.deltas.entry(name.into()).or_insert(0.0) += value;
        self
    }
}

/// Authoritative state after replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    /// Highest version applied (or the starting version if none was)
    pub version: i64,
    pub applied_count: u64,
    pub totals: DispatchState,
}

impl DispatchSnapshot {
    /// Accumulated value for `name`, zero when never touched
    pub fn total(&self, name: &str) -> f64 {
        self.totals.get(name).copied().unwrap_or(0.0)
    }
}

/// Per-replay outcome counts for audit logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub applied: u64,
    pub stale: u64,
    pub duplicate: u64,
}

/// Replay `events` on top of `base_state` at `current_version`.
pub fn replay(
    base_state: &DispatchState,
    current_version: i64,
    events: &[DispatchEvent],
) -> DispatchSnapshot {
    replay_with_stats(base_state, current_version, events).0
}

/// Same as [`replay`], also reporting how many events were applied or skipped.
pub fn replay_with_stats(
    base_state: &DispatchState,
    current_version: i64,
    events: &[DispatchEvent],
) -> (DispatchSnapshot, ReplayStats) {
    let mut ordered: Vec<&DispatchEvent> = events.iter().collect();
    ordered.sort_by(|a, b| {
        a.version
            .cmp(&b.version)
            .then_with(|| a.idempotency_key.cmp(&b.idempotency_key))
    });

    let mut snapshot = DispatchSnapshot {
        version: current_version,
        applied_count: 0,
        totals: base_state.clone(),
    };
    let mut stats = ReplayStats::default();
    let mut applied_keys: HashSet<&str> = HashSet::with_capacity(ordered.len());

    for event in ordered {
        if applied_keys.contains(event.idempotency_key.as_str()) {
            debug!(
                version = event.version,
                idempotency_key = %event.idempotency_key,
                "Skipping duplicate event"
            );
            stats.duplicate += 1;
            continue;
        }

        if event.version <= snapshot.version {
            debug!(
                version = event.version,
                snapshot_version = snapshot.version,
                idempotency_key = %event.idempotency_key,
                "Skipping stale event"
            );
            stats.stale += 1;
            continue;
        }

        applied_keys.insert(event.idempotency_key.as_str());

        for (name, delta) in &event.deltas {
            *snapshot.totals.entry(name.clone()).or_insert(0.0) += delta;
        }
        snapshot.version = event.version;
        snapshot.applied_count += 1;
        stats.applied += 1;
    }

    info!(
        from_version = current_version,
        to_version = snapshot.version,
        applied = stats.applied,
        stale = stats.stale,
        duplicate = stats.duplicate,
        "Replay complete"
    );
    ReplayMetrics::record_events("applied", stats.applied);
    ReplayMetrics::record_events("stale", stats.stale);
    ReplayMetrics::record_events("duplicate", stats.duplicate);

    (snapshot, stats)
}
