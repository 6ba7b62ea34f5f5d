//! Pending units of work and their result channels.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::RequestError;

/// Boxed future produced by one invocation of a queued task.
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T, RequestError>> + Send>>;

/// Terminal error delivered for a task that panicked.
pub(crate) const PANICKED_MESSAGE: &str = "queued task panicked";

pub(crate) type BoxedTask<T> = Box<dyn FnMut() -> TaskFuture<T> + Send>;

/// Opaque identifier assigned to each queued item.
///
/// Identifiers are unique per queue and exist for diagnostics only; they
/// never influence ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "item-{}", self.0)
    }
}

/// Type-erased task plus the sink for its eventual outcome.
#[async_trait]
pub(crate) trait Job: Send {
    /// Runs the task once, delivering the value to the caller on success.
    async fn attempt(&mut self) -> Result<(), RequestError>;

    /// Delivers a terminal error to the caller.
    fn reject(self: Box<Self>, error: RequestError);
}

/// Caller-side end of an item: releases the queue's outstanding count, then
/// hands over the outcome.
struct Completion<T> {
    sink: oneshot::Sender<Result<T, RequestError>>,
    outstanding: Arc<AtomicUsize>,
}

impl<T> Completion<T> {
    fn deliver(self, outcome: Result<T, RequestError>) {
        // The count drops before the caller can observe the outcome.
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        if self.sink.send(outcome).is_err() {
            tracing::debug!("caller dropped the task handle; discarding outcome");
        }
    }
}

struct TypedJob<T> {
    task: BoxedTask<T>,
    completion: Option<Completion<T>>,
}

impl<T: Send + 'static> TypedJob<T> {
    /// Invokes the task and runs its future on its own Tokio task, so a
    /// panic in either step fails this attempt only.
    async fn run_guarded(&mut self) -> Result<T, RequestError> {
        let future = panic::catch_unwind(AssertUnwindSafe(|| (self.task)()))
            .map_err(|payload| panicked(&*payload))?;

        match tokio::spawn(future).await {
            Ok(outcome) => outcome,
            Err(error) if error.is_panic() => Err(panicked(&*error.into_panic())),
            Err(_) => Err(RequestError::QueueClosed),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Job for TypedJob<T> {
    async fn attempt(&mut self) -> Result<(), RequestError> {
        let value = self.run_guarded().await?;
        if let Some(completion) = self.completion.take() {
            completion.deliver(Ok(value));
        }
        Ok(())
    }

    fn reject(mut self: Box<Self>, error: RequestError) {
        if let Some(completion) = self.completion.take() {
            completion.deliver(Err(error));
        }
    }
}

fn panicked(payload: &(dyn Any + Send)) -> RequestError {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    tracing::warn!("queued task panicked: {detail}");
    RequestError::failed(PANICKED_MESSAGE)
}

/// One pending unit of work owned by the queue until it is terminal.
pub(crate) struct QueueItem {
    pub(crate) id: ItemId,
    pub(crate) retry_count: u32,
    job: Box<dyn Job>,
}

impl QueueItem {
    pub(crate) fn new<T: Send + 'static>(
        id: ItemId,
        task: BoxedTask<T>,
        sink: oneshot::Sender<Result<T, RequestError>>,
        outstanding: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            id,
            retry_count: 0,
            job: Box::new(TypedJob {
                task,
                completion: Some(Completion { sink, outstanding }),
            }),
        }
    }

    pub(crate) async fn attempt(&mut self) -> Result<(), RequestError> {
        self.job.attempt().await
    }

    pub(crate) fn reject(self, error: RequestError) {
        self.job.reject(error);
    }

    /// Attempts made so far, counting the one that just finished.
    pub(crate) const fn attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

impl fmt::Debug for QueueItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QueueItem")
            .field("id", &self.id)
            .field("retry_count", &self.retry_count)
            .finish_non_exhaustive()
    }
}
