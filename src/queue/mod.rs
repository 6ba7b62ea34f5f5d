//! Single-worker request queue with quota-window admission and tail retry.
//!
//! Producers submit zero-argument asynchronous tasks through
//! [`RequestQueue::enqueue`] and receive a [`TaskHandle`] straight away. One
//! worker task executes items strictly one at a time in arrival order. Before
//! each attempt the worker consults a [`RateWindow`]; when the window is full
//! it sleeps until the window elapses. A task that fails with a rate-limit
//! error (see [`is_rate_limit_error`]) is moved to the tail of the queue and
//! the worker backs off before continuing, up to
//! [`QueueConfig::max_retries`] times. Every other failure is delivered to
//! the task's own caller and never affects sibling items; a task that
//! panics is reported to its caller as a terminal failure in the same way.
//!
//! The queue is constructed explicitly by the application's composition root
//! and shared by cloning the handle.

mod classify;
mod config;
mod item;
mod rate_window;
mod worker;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

pub use classify::is_rate_limit_error;
pub use config::QueueConfig;
pub use item::{ItemId, TaskFuture};
pub use rate_window::RateWindow;

use self::item::{BoxedTask, QueueItem};
use self::worker::Worker;
use crate::error::RequestError;
use crate::telemetry::{NoopTelemetrySink, TelemetrySink};

/// Cloneable handle to a running request queue.
///
/// All clones feed the same worker. The worker stops once every handle has
/// been dropped and the remaining items have reached a terminal state.
#[derive(Clone)]
pub struct RequestQueue {
    sender: mpsc::UnboundedSender<QueueItem>,
    next_id: Arc<AtomicU64>,
    outstanding: Arc<AtomicUsize>,
}

impl RequestQueue {
    /// Starts a queue worker on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(config: QueueConfig) -> Self {
        Self::spawn_with_telemetry(config, Arc::new(NoopTelemetrySink))
    }

    /// Starts a queue worker that reports outcomes to `telemetry`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn_with_telemetry(config: QueueConfig, telemetry: Arc<dyn TelemetrySink>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Worker::new(receiver, config, telemetry).run());

        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Appends `task` to the tail of the queue.
    ///
    /// Returns immediately. The task is invoked once per attempt, so a
    /// rate-limited retry calls it again. The task still runs when the
    /// returned handle is dropped; its outcome is then discarded.
    pub fn enqueue<T, F, Fut>(&self, mut task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        let (sink, receiver) = oneshot::channel();
        let id = ItemId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let boxed: BoxedTask<T> = Box::new(move || -> TaskFuture<T> { Box::pin(task()) });

        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let item = QueueItem::new(id, boxed, sink, Arc::clone(&self.outstanding));
        if self.sender.send(item).is_err() {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(item = %id, "request queue worker is gone; task dropped");
        }

        TaskHandle { receiver }
    }

    /// Number of submitted items that have not yet reached a terminal state,
    /// including the one currently executing.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RequestQueue")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Future resolving to the outcome of one queued task.
///
/// Resolves to [`RequestError::QueueClosed`] if the worker stops before the
/// task reaches a terminal state.
#[must_use = "dropping the handle discards the task's outcome"]
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T, RequestError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, RequestError>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(context)
            .map(|received| received.unwrap_or(Err(RequestError::QueueClosed)))
    }
}
