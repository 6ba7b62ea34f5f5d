//! Behavioural tests for queue ordering, retry, and quota-window behaviour.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use prpulse::queue::TaskFuture;
use prpulse::{QueueConfig, RequestError, RequestQueue};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use tokio::runtime::Builder;
use tokio::time::Instant;

mod support;

use support::runtime::SharedRuntime;

type StepResult = Result<(), Box<dyn std::error::Error>>;
type Log = Arc<Mutex<Vec<String>>>;

#[derive(ScenarioState, Default)]
struct QueueState {
    runtime: Slot<SharedRuntime>,
    queue: Slot<RequestQueue>,
    completions: Slot<Vec<String>>,
    attempts: Slot<u32>,
    outcome: Slot<Result<String, RequestError>>,
    start_offsets: Slot<Vec<Duration>>,
}

#[fixture]
fn queue_state() -> QueueState {
    QueueState::default()
}

/// Starts a paused-clock runtime and a queue on it.
fn start_queue(queue_state: &QueueState, config: QueueConfig) -> StepResult {
    let runtime = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;
    let shared = SharedRuntime::new(runtime);
    let queue = shared.block_on(async { RequestQueue::spawn(config) });

    queue_state.runtime.set(shared);
    queue_state.queue.set(queue);
    Ok(())
}

fn runtime_and_queue(
    queue_state: &QueueState,
) -> Result<(SharedRuntime, RequestQueue), Box<dyn std::error::Error>> {
    let runtime = queue_state.runtime.get().ok_or("runtime not initialised")?;
    let queue = queue_state.queue.get().ok_or("queue not initialised")?;
    Ok((runtime, queue))
}

/// Fails with a rate-limit error `failures` times, then logs `label`.
fn logging_task(
    log: &Log,
    label: &'static str,
    failures: u32,
) -> impl FnMut() -> TaskFuture<String> + Send + 'static {
    let shared = Arc::clone(log);
    let mut attempts = 0_u32;
    move || {
        attempts += 1;
        let failing = attempts <= failures;
        let entries = Arc::clone(&shared);
        Box::pin(async move {
            if failing {
                return Err(RequestError::failed("rate limit exceeded"));
            }
            entries
                .lock()
                .map_err(|_| RequestError::failed("completion log poisoned"))?
                .push(label.to_owned());
            Ok(label.to_owned())
        })
    }
}

#[given("a request queue with the default limits")]
fn default_queue(queue_state: &QueueState) -> StepResult {
    start_queue(queue_state, QueueConfig::default())
}

#[given("a request queue allowing {max:u32} requests per window of {seconds:u64} seconds")]
fn limited_queue(queue_state: &QueueState, max: u32, seconds: u64) -> StepResult {
    start_queue(
        queue_state,
        QueueConfig {
            max_requests_per_window: max,
            window: Duration::from_secs(seconds),
            ..QueueConfig::default()
        },
    )
}

#[when("task A fails once with a rate limit error and tasks B and C succeed")]
fn one_retry_among_siblings(queue_state: &QueueState) -> StepResult {
    let (runtime, queue) = runtime_and_queue(queue_state)?;
    let log: Log = Arc::default();

    runtime.block_on(async {
        let first = queue.enqueue(logging_task(&log, "A", 1));
        let second = queue.enqueue(logging_task(&log, "B", 0));
        let third = queue.enqueue(logging_task(&log, "C", 0));
        first.await?;
        second.await?;
        third.await?;
        Ok::<(), RequestError>(())
    })?;

    let completions = log
        .lock()
        .map_err(|_| "completion log poisoned")?
        .clone();
    queue_state.completions.set(completions);
    Ok(())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[when("a task always fails with {message}")]
fn always_failing_task(queue_state: &QueueState, message: String) -> StepResult {
    let (runtime, queue) = runtime_and_queue(queue_state)?;
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let failure = RequestError::failed(message.trim_matches('"'));

    let outcome = runtime.block_on(queue.enqueue(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let error = failure.clone();
        async move { Err::<String, _>(error) }
    }));

    queue_state.attempts.set(attempts.load(Ordering::SeqCst));
    queue_state.outcome.set(outcome);
    Ok(())
}

#[when("{count:usize} quick tasks are submitted")]
fn quick_tasks(queue_state: &QueueState, count: usize) -> StepResult {
    let (runtime, queue) = runtime_and_queue(queue_state)?;
    let starts: Arc<Mutex<Vec<Instant>>> = Arc::default();

    runtime.block_on(async {
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let recorded = Arc::clone(&starts);
                queue.enqueue(move || {
                    let entries = Arc::clone(&recorded);
                    async move {
                        entries
                            .lock()
                            .map_err(|_| RequestError::failed("start log poisoned"))?
                            .push(Instant::now());
                        Ok::<(), RequestError>(())
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await?;
        }
        Ok::<(), RequestError>(())
    })?;

    let recorded = starts.lock().map_err(|_| "start log poisoned")?.clone();
    let first = *recorded.first().ok_or("no task started")?;
    queue_state.start_offsets.set(
        recorded
            .iter()
            .map(|start| start.saturating_duration_since(first))
            .collect(),
    );
    Ok(())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[then("the tasks complete in the order {order}")]
fn completion_order(queue_state: &QueueState, order: String) -> StepResult {
    let completions = queue_state
        .completions
        .get()
        .ok_or("no completions recorded")?;
    let actual = completions.join(", ");

    if actual == order.trim_matches('"') {
        Ok(())
    } else {
        Err(format!("expected completion order {order}, got {actual:?}").into())
    }
}

#[then("the task was attempted {count:u32} times")]
fn attempted_times(queue_state: &QueueState, count: u32) -> StepResult {
    let attempts = queue_state.attempts.get().ok_or("no attempts recorded")?;

    if attempts == count {
        Ok(())
    } else {
        Err(format!("expected {count} attempts, got {attempts}").into())
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[then("the task fails mentioning {text}")]
fn task_fails_mentioning(queue_state: &QueueState, text: String) -> StepResult {
    let outcome = queue_state.outcome.get().ok_or("no outcome recorded")?;

    match outcome {
        Err(error) if error.to_string().contains(text.trim_matches('"')) => Ok(()),
        other => Err(format!("expected a failure mentioning {text}, got {other:?}").into()),
    }
}

#[then("task {position:usize} started at least {seconds:u64} seconds after the first")]
fn started_at_least(queue_state: &QueueState, position: usize, seconds: u64) -> StepResult {
    let offset = start_offset(queue_state, position)?;

    if offset >= Duration::from_secs(seconds) {
        Ok(())
    } else {
        Err(format!("task {position} started after only {offset:?}").into())
    }
}

#[then("task {position:usize} started less than {seconds:u64} seconds after the first")]
fn started_less_than(queue_state: &QueueState, position: usize, seconds: u64) -> StepResult {
    let offset = start_offset(queue_state, position)?;

    if offset < Duration::from_secs(seconds) {
        Ok(())
    } else {
        Err(format!("task {position} waited {offset:?}").into())
    }
}

fn start_offset(
    queue_state: &QueueState,
    position: usize,
) -> Result<Duration, Box<dyn std::error::Error>> {
    let offsets = queue_state
        .start_offsets
        .get()
        .ok_or("no start times recorded")?;
    position
        .checked_sub(1)
        .and_then(|index| offsets.get(index).copied())
        .ok_or_else(|| format!("no task at position {position}").into())
}

#[scenario(path = "tests/features/request_queue.feature", index = 0)]
fn rate_limited_task_retried_behind_siblings(queue_state: QueueState) {
    let _ = queue_state;
}

#[scenario(path = "tests/features/request_queue.feature", index = 1)]
fn persistent_rate_limiting_exhausts_retries(queue_state: QueueState) {
    let _ = queue_state;
}

#[scenario(path = "tests/features/request_queue.feature", index = 2)]
fn window_maximum_delays_dispatch(queue_state: QueueState) {
    let _ = queue_state;
}
