//! Parsing of server `Retry-After` values into the stored retry-after field.

use std::time::SystemTime;

use tracing::{debug, instrument, warn};

/// Smallest retry-after the store keeps, in seconds.
pub const MIN_RETRY_AFTER_SECS: u32 = 30;

/// Largest retry-after the store keeps (24 hours), in seconds.
pub const MAX_RETRY_AFTER_SECS: u32 = 24 * 60 * 60;

/// Parses a `Retry-After` header value into whole seconds.
///
/// Accepts delta-seconds or an HTTP-date (relative to `now`). The result is
/// clamped to `MIN_RETRY_AFTER_SECS..=MAX_RETRY_AFTER_SECS`. Returns `None`
/// for unparseable values, negative deltas and dates already past.
///
/// # Example
///
/// ```
/// use std::time::SystemTime;
/// use download_provider::scheduler::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120", SystemTime::now()), Some(120));
/// assert_eq!(parse_retry_after("1", SystemTime::now()), Some(30));
/// assert_eq!(parse_retry_after("soon", SystemTime::now()), None);
/// ```
#[must_use]
#[instrument(skip(now))]
pub fn parse_retry_after(header_value: &str, now: SystemTime) -> Option<u32> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }
        return Some(clamp(u64::try_from(seconds).unwrap_or(u64::MAX)));
    }

    let Ok(datetime) = httpdate::parse_http_date(header_value) else {
        debug!(header_value, "unparseable Retry-After value");
        return None;
    };
    match datetime.duration_since(now) {
        Ok(delta) => Some(clamp(delta.as_secs())),
        Err(_) => {
            debug!(header_value, "Retry-After date is in the past, ignoring");
            None
        }
    }
}

fn clamp(seconds: u64) -> u32 {
    if seconds > u64::from(MAX_RETRY_AFTER_SECS) {
        warn!(
            seconds,
            max_seconds = MAX_RETRY_AFTER_SECS,
            "Retry-After exceeds maximum, capping"
        );
        return MAX_RETRY_AFTER_SECS;
    }
    u32::try_from(seconds)
        .unwrap_or(MAX_RETRY_AFTER_SECS)
        .max(MIN_RETRY_AFTER_SECS)
}
