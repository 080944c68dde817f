//! Small shared utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in microseconds since the Unix epoch.
///
/// Every timestamp the engine assigns (order acceptance, trades, cancels)
/// comes from this clock.
#[must_use]
pub fn current_time_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
