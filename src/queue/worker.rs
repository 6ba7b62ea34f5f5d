//! The single consumer that drains the request queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use super::classify::is_rate_limit_error;
use super::config::QueueConfig;
use super::item::QueueItem;
use super::rate_window::RateWindow;
use crate::error::RequestError;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Owns the pending list and the rate window; runs one item at a time.
pub(crate) struct Worker {
    incoming: mpsc::UnboundedReceiver<QueueItem>,
    pending: VecDeque<QueueItem>,
    window: RateWindow,
    config: QueueConfig,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Worker {
    pub(crate) const fn new(
        incoming: mpsc::UnboundedReceiver<QueueItem>,
        config: QueueConfig,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            incoming,
            pending: VecDeque::new(),
            window: RateWindow::new(config.max_requests_per_window, config.window),
            config,
            telemetry,
        }
    }

    /// Processes items until every producer handle is gone and the pending
    /// list is empty.
    pub(crate) async fn run(mut self) {
        while let Some(item) = self.next_item().await {
            self.process(item).await;
        }
        tracing::debug!("request queue worker stopped");
    }

    async fn next_item(&mut self) -> Option<QueueItem> {
        self.drain_incoming();
        if let Some(item) = self.pending.pop_front() {
            return Some(item);
        }
        self.incoming.recv().await
    }

    fn drain_incoming(&mut self) {
        while let Ok(item) = self.incoming.try_recv() {
            self.pending.push_back(item);
        }
    }

    async fn process(&mut self, mut item: QueueItem) {
        self.wait_for_capacity().await;

        tracing::debug!(
            item = %item.id,
            retry_count = item.retry_count,
            "dispatching queued task"
        );

        match item.attempt().await {
            Ok(()) => {
                self.window.record_dispatch(Instant::now());
                self.telemetry.record(TelemetryEvent::TaskSucceeded {
                    item_id: item.id.get(),
                    attempts: item.attempts(),
                });
            }
            Err(error)
                if is_rate_limit_error(&error) && item.retry_count < self.config.max_retries =>
            {
                self.requeue(item, &error);
                sleep(self.config.retry_delay).await;
            }
            Err(error) => self.reject(item, error),
        }
    }

    async fn wait_for_capacity(&mut self) {
        let Some(wait) = self.window.admit(Instant::now()) else {
            return;
        };

        tracing::warn!(
            wait_ms = millis(wait),
            requests = self.window.requests_in_window(),
            "request quota window is full; pausing dispatch"
        );
        self.telemetry.record(TelemetryEvent::RateWindowWait {
            wait_ms: millis(wait),
        });
        sleep(wait).await;
        self.window.reset();
    }

    fn requeue(&mut self, mut item: QueueItem, error: &RequestError) {
        item.retry_count = item.retry_count.saturating_add(1);
        tracing::info!(
            item = %item.id,
            retry_count = item.retry_count,
            "rate-limited task moved to the back of the queue: {error}"
        );
        self.telemetry.record(TelemetryEvent::TaskRequeued {
            item_id: item.id.get(),
            retry_count: item.retry_count,
            message: error.to_string(),
        });

        // Anything submitted while the attempt ran goes ahead of the retry.
        self.drain_incoming();
        self.pending.push_back(item);
    }

    fn reject(&self, item: QueueItem, error: RequestError) {
        if is_rate_limit_error(&error) {
            tracing::warn!(
                item = %item.id,
                attempts = item.attempts(),
                "rate-limited task exhausted its retries: {error}"
            );
        } else {
            tracing::debug!(item = %item.id, "queued task failed: {error}");
        }
        self.telemetry.record(TelemetryEvent::TaskRejected {
            item_id: item.id.get(),
            attempts: item.attempts(),
            message: error.to_string(),
        });
        item.reject(error);
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
