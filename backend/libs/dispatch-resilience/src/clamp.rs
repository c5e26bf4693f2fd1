//! Configuration clamping shared by every component.
//!
//! Invalid settings are pulled to the nearest safe value instead of being
//! rejected.

/// Counts and limits that must allow at least one event.
pub(crate) fn at_least_one(value: u32) -> u32 {
    value.max(1)
}

/// Millisecond durations cannot be negative.
pub(crate) fn non_negative_ms(value: i64) -> i64 {
    value.max(0)
}

/// Ratios and fractions: NaN and negatives collapse to zero.
pub(crate) fn non_negative_ratio(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}
