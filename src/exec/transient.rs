//! Classification of failed runs into retryable and permanent failures.

use std::time::Duration;

use super::ExecOutcome;

/// Lowercase stderr markers of failures that usually clear up on retry.
const TRANSIENT_MARKERS: &[&str] = &[
    // rate limiting
    "rate limit",
    "too many requests",
    "429",
    // upstream 5xx
    "500",
    "502",
    "503",
    "504",
    "internal server error",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
    // network
    "connection reset",
    "connection refused",
    "econnreset",
    "econnrefused",
    "etimedout",
    "network error",
    "fetch failed",
    "socket hang up",
];

/// Whether a failed attempt is worth retrying.
///
/// Successful and timed-out outcomes are never transient. Anything without a
/// known marker (including bad credentials) is treated as permanent.
pub fn is_transient_error(outcome: &ExecOutcome) -> bool {
    if outcome.exit_code == 0 || outcome.timed_out {
        return false;
    }
    let stderr = outcome.stderr.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// Exponential backoff: `base * 2^attempt`, capped at `max`.
pub fn retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}
