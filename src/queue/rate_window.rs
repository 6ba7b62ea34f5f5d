//! Request accounting for the upstream quota window.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks how many dispatches happened in the current quota window.
///
/// The window is anchored on the most recent successful dispatch. Once more
/// than `window` has elapsed since that dispatch the count starts again from
/// zero. When the count reaches `max_requests` inside the window, the caller
/// waits out the remainder and then calls [`RateWindow::reset`]; the reset is
/// unconditional and does not re-derive the remaining quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    max_requests: u32,
    window: Duration,
    last_dispatch: Option<Instant>,
    requests_in_window: u32,
}

impl RateWindow {
    /// Creates an empty window allowing `max_requests` per `window`.
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            last_dispatch: None,
            requests_in_window: 0,
        }
    }

    /// Returns how long the next dispatch must wait, if at all.
    ///
    /// Resets the count first when the window has elapsed since the last
    /// recorded dispatch.
    pub fn admit(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = self
            .last_dispatch
            .map(|last| now.saturating_duration_since(last));

        if elapsed.is_none_or(|since_last| since_last > self.window) {
            self.requests_in_window = 0;
        }

        if self.requests_in_window < self.max_requests {
            return None;
        }

        Some(self.window.saturating_sub(elapsed.unwrap_or(Duration::ZERO)))
    }

    /// Records one successful dispatch at `now`.
    pub fn record_dispatch(&mut self, now: Instant) {
        self.requests_in_window = self.requests_in_window.saturating_add(1);
        self.last_dispatch = Some(now);
    }

    /// Clears the count after the caller has waited out the window.
    pub const fn reset(&mut self) {
        self.requests_in_window = 0;
    }

    /// Number of dispatches counted in the current window.
    #[must_use]
    pub const fn requests_in_window(&self) -> u32 {
        self.requests_in_window
    }
}
