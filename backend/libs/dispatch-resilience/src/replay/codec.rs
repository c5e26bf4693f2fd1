//! Newline-delimited JSON codec for the dispatch event log
//!
//! One `DispatchEvent` per line:
//!
//! ```text
//! {"version":6,"idempotency_key":"a","deltas":{"generation_mw":10.0}}
//! {"version":7,"idempotency_key":"b","deltas":{"reserve_mw":-2.5}}
//! ```
//!
//! Blank lines are ignored so logs with trailing newlines decode cleanly.

use super::error::{ReplayError, ReplayResult};
use super::DispatchEvent;

/// Decode a newline-delimited JSON event log.
pub fn decode_event_log(input: &str) -> ReplayResult<Vec<DispatchEvent>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| ReplayError::Decode {
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Encode events as newline-delimited JSON, one event per line.
///
/// Fails on NaN or infinite deltas, which JSON cannot represent.
pub fn encode_event_log(events: &[DispatchEvent]) -> ReplayResult<String> {
    let mut out = String::new();
    for event in events {
        if let Some((name, value)) = event.deltas.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ReplayError::NonFiniteDelta {
                idempotency_key: event.idempotency_key.clone(),
                name: name.clone(),
                value: *value,
            });
        }
        let line = serde_json::to_string(event).map_err(|source| ReplayError::Encode {
            idempotency_key: event.idempotency_key.clone(),
            source,
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}
