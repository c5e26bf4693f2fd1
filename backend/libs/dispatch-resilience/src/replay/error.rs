//! Error types for the event-log boundary

use thiserror::Error;

/// Result type for event-log decoding and encoding
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Errors raised while moving events across the log boundary.
///
/// Replay itself never fails: stale and duplicate events are skipped, not
/// reported.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// A log line is not a valid `DispatchEvent`
    #[error("Malformed event on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// An event could not be serialized
    #[error("Failed to encode event {idempotency_key}: {source}")]
    Encode {
        idempotency_key: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON has no NaN or infinity, so the line would not decode again
    #[error("Event {idempotency_key} has non-finite delta for {name}: {value}")]
    NonFiniteDelta {
        idempotency_key: String,
        name: String,
        value: f64,
    },
}

impl ReplayError {
    /// 1-based log line of a decode failure
    pub fn line(&self) -> Option<usize> {
        match self {
            ReplayError::Decode { line, .. } => Some(*line),
            ReplayError::Encode { .. } | ReplayError::NonFiniteDelta { .. } => None,
        }
    }
}
