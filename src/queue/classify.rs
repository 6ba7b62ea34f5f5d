//! Rate-limit classification for failed queue attempts.

use http::StatusCode;

use crate::error::RequestError;

/// Returns true when a failure should be treated as an upstream rate limit.
///
/// The rule matches the error's rendered message against `"rate limit"` and
/// `"too many requests"` (case-sensitive) and also accepts any error that
/// carries HTTP status 429. Retry handling in the worker only ever consults
/// this function, so the rule can move to structured codes in one place.
///
/// # Example
///
/// ```
/// use prpulse::RequestError;
/// use prpulse::queue::is_rate_limit_error;
///
/// assert!(is_rate_limit_error(&RequestError::failed("rate limit exceeded")));
/// assert!(is_rate_limit_error(&RequestError::with_status(429, "slow down")));
/// assert!(!is_rate_limit_error(&RequestError::failed("invalid input")));
/// ```
#[must_use]
pub fn is_rate_limit_error(error: &RequestError) -> bool {
    let message = error.to_string();

    message.contains("rate limit")
        || message.contains("too many requests")
        || error.status() == Some(StatusCode::TOO_MANY_REQUESTS.as_u16())
}
