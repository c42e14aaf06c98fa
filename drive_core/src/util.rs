//! Common time helpers for drive_core.

use std::time::Duration;

/// Number of milliseconds in one second; scales tick deltas over `dt` in ms
/// to ticks per second.
pub const MILLIS_PER_SEC: i64 = 1_000;

/// Milliseconds as a signed timestamp, saturating at `i64::MAX`.
#[inline]
pub fn ms_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Duration in whole milliseconds as a signed value, saturating.
#[inline]
pub fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
