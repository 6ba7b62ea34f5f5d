//! Queue telemetry events and sinks.
//!
//! The request queue reports one event per terminal or requeue outcome and
//! one per quota wait. Sinks are local-only; nothing is transmitted.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by the request queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A task completed and its caller received the value.
    TaskSucceeded {
        /// Queue-assigned item identifier.
        item_id: u64,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// A rate-limited task was moved to the tail of the queue.
    TaskRequeued {
        /// Queue-assigned item identifier.
        item_id: u64,
        /// Retry count after this requeue.
        retry_count: u32,
        /// Rendered error that triggered the requeue.
        message: String,
    },
    /// A task failed terminally and its caller received the error.
    TaskRejected {
        /// Queue-assigned item identifier.
        item_id: u64,
        /// Attempts made before giving up.
        attempts: u32,
        /// Rendered error delivered to the caller.
        message: String,
    },
    /// The worker paused because the quota window was full.
    RateWindowWait {
        /// Pause length in milliseconds.
        wait_ms: u64,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        if let Err(error) = writeln_stderr(&serialised) {
            tracing::trace!("failed to write telemetry event: {error}");
        }
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}
