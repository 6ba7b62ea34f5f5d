//! Throttling and retry settings for [`super::RequestQueue`].

use std::time::Duration;

const DEFAULT_MAX_REQUESTS_PER_WINDOW: u32 = 20;
const DEFAULT_WINDOW_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

/// Settings that govern admission and retry behaviour of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Successful dispatches allowed per window before the worker waits.
    pub max_requests_per_window: u32,
    /// Length of the quota window.
    pub window: Duration,
    /// Requeues allowed for a rate-limited task before it is rejected.
    pub max_retries: u32,
    /// Pause after a rate-limited attempt before the next item runs.
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}
