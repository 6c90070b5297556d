//! Bounded task executor
//!
//! The executor queues units of work and runs them as one batch per
//! [`Executor::run`] call. With a limit of one, units run strictly one after
//! another. Any other limit selects the gated strategy: every unit waits for a
//! slot of a semaphore before it starts, so at most `limit` units are in flight
//! (`0` disables the gate). All units of a batch are polled from the future
//! returned by `run`, they interleave at their own await points.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{
    ConfigResult, EventError, EventResult, ExecutorError, ExecutorResult, RunError,
};
use crate::events::{EventDispatcher, Handler};
use crate::invoke::safe_invoke;
use crate::limits::Limit;
use crate::reporter::{EventKind, ExecutorEvent, TaskStatus};
use crate::task::{TaskRecord, TaskResult, Unit, UnitFuture};
use crate::types::{
    CompletedTask, ExecutorConfig, PendingTask, ReturnWhen, RunOptions, RunOutput, RunPolicy,
};

/// Runs queued units of work with a concurrency ceiling.
///
/// `Executor` is a cheap handle: clones share the same queue, gate and
/// subscribers. Units can hold a clone and call [`Executor::cancel`] to stop
/// the rest of their batch.
///
/// # Example
///
/// ```rust
/// use flowgate::{Executor, RunOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let executor: Executor<u32, std::io::Error> = Executor::new(2);
/// for value in 0..4 {
///     executor.add_fn(move || async move { Ok(value * 10) })?;
/// }
///
/// let output = executor.run(RunOptions::new()).await?;
/// assert_eq!(output.completed.len(), 4);
/// assert!(output.pending.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Executor<T, E> {
    inner: Arc<ExecutorInner<T, E>>,
}

struct ExecutorInner<T, E> {
    config: ExecutorConfig,
    state: Mutex<QueueState<T, E>>,
    /// Set for the whole duration of a run.
    running: AtomicBool,
    /// Bumped whenever a batch is closed; detached units of older batches stay silent.
    generation: AtomicU64,
    dispatcher: EventDispatcher<ExecutorEvent>,
}

struct QueueState<T, E> {
    queue: VecDeque<TaskRecord<T, E>>,
    next_index: usize,
    /// `None` when the limit is unbounded.
    gate: Option<Arc<Semaphore>>,
    /// Token of the current batch; cancelled by `cancel` and by the post-run reset.
    batch: CancellationToken,
}

impl<T, E> QueueState<T, E> {
    fn new(limit: Limit) -> Self {
        Self {
            queue: VecDeque::new(),
            next_index: 0,
            gate: build_gate(limit),
            batch: CancellationToken::new(),
        }
    }
}

fn build_gate(limit: Limit) -> Option<Arc<Semaphore>> {
    limit.resolve().map(|slots| Arc::new(Semaphore::new(slots)))
}

/// Everything a unit needs to run inside a batch.
struct BatchContext {
    gate: Option<Arc<Semaphore>>,
    token: CancellationToken,
    generation: u64,
    capture: bool,
}

impl Clone for BatchContext {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            token: self.token.clone(),
            generation: self.generation,
            capture: self.capture,
        }
    }
}

/// Why a unit did not produce a [`TaskResult`].
enum Failure<E> {
    Unit(E),
    Event(EventError),
}

impl<E> Failure<E> {
    fn into_run_error(self, index: usize) -> RunError<E> {
        match self {
            Failure::Unit(source) => RunError::unit(index, source),
            Failure::Event(err) => RunError::Event(err),
        }
    }
}

struct Settled<T, E> {
    index: usize,
    outcome: Result<TaskResult<T, E>, Failure<E>>,
}

impl<T, E> Settled<T, E> {
    fn cancelled(index: usize) -> Self {
        Self {
            index,
            outcome: Ok(TaskResult::Cancelled),
        }
    }
}

/// A unit wrapped for scheduling, remembering its index while in flight.
struct Tracked<T, E> {
    index: usize,
    future: BoxFuture<'static, Settled<T, E>>,
}

impl<T, E> Future for Tracked<T, E> {
    type Output = Settled<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl<T, E> Tracked<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Let the unit finish in the background.
    fn detach(self) -> PendingTask<T, E> {
        let index = self.index;
        let future = self
            .future
            .map(move |settled| match settled.outcome {
                Ok(result) => result,
                Err(Failure::Unit(err)) => TaskResult::Error(err),
                Err(Failure::Event(err)) => {
                    warn!(index, error = %err, "event handler failed for a detached task");
                    TaskResult::Cancelled
                }
            })
            .boxed();
        PendingTask::spawn(index, future)
    }
}

/// What a scheduling strategy produced.
struct Batch<T, E> {
    completed: Vec<CompletedTask<T, E>>,
    pending: Vec<PendingTask<T, E>>,
    failure: Option<RunError<E>>,
}

impl<T, E> Batch<T, E> {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            pending: Vec::new(),
            failure: None,
        }
    }

    fn failed(failure: RunError<E>) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new()
        }
    }
}

/// Clears the run state even if the `run` future is dropped early.
struct RunGuard<'a, T, E> {
    inner: &'a ExecutorInner<T, E>,
}

impl<T, E> Drop for RunGuard<'_, T, E> {
    fn drop(&mut self) {
        self.inner.reset_state();
        self.inner.running.store(false, Ordering::Release);
    }
}

impl<T, E> Clone for Executor<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Executor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("limit", &self.inner.config.limit)
            .field("queued", &self.inner.state.lock().queue.len())
            .field("running", &self.inner.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T, E> Default for Executor<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    fn default() -> Self {
        Self::from_config(ExecutorConfig::default())
    }
}

impl<T, E> ExecutorInner<T, E> {
    fn reset_state(&self) {
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.next_index = 0;
            state.batch.cancel();
            state.gate = build_gate(self.config.limit);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dispatcher.clear();
        debug!("executor state reset");
    }
}

impl<T, E> ExecutorInner<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    /// Fire a unit event, unless the unit's batch has been closed meanwhile.
    async fn notify(
        &self,
        generation: u64,
        kind: EventKind,
        event: ExecutorEvent,
    ) -> EventResult<()> {
        if self.generation.load(Ordering::Acquire) != generation {
            trace!(event = kind.as_str(), "batch closed, event dropped");
            return Ok(());
        }
        self.dispatcher.trigger(kind.as_str(), event).await
    }

    /// Run an admitted unit, firing its lifecycle events around it.
    async fn execute(
        &self,
        index: usize,
        future: UnitFuture<T, E>,
        context: &BatchContext,
    ) -> Result<TaskResult<T, E>, Failure<E>> {
        self.notify(
            context.generation,
            EventKind::TaskStart,
            ExecutorEvent::TaskStarted { index },
        )
        .await
        .map_err(Failure::Event)?;

        let started = Instant::now();
        let result = safe_invoke(future, context.capture)
            .await
            .map_err(Failure::Unit)?;

        let status = match &result {
            TaskResult::Error(err) => TaskStatus::Failed {
                error: format!("{err:?}"),
            },
            _ => TaskStatus::Succeeded,
        };
        self.notify(
            context.generation,
            EventKind::TaskFinish,
            ExecutorEvent::TaskFinished {
                index,
                status,
                duration: started.elapsed(),
            },
        )
        .await
        .map_err(Failure::Event)?;

        Ok(result)
    }
}

impl<T, E> Executor<T, E>
where
    T: Send + 'static,
    E: fmt::Debug + Send + 'static,
{
    /// Create an executor with the given concurrency limit, `0` meaning unbounded
    pub fn new(limit: impl Into<Limit>) -> Self {
        Self::from_config(ExecutorConfig::default().with_limit(limit))
    }

    /// Create an executor with a custom configuration
    pub fn with_config(config: ExecutorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: ExecutorConfig) -> Self {
        let state = QueueState::new(config.limit);
        Self {
            inner: Arc::new(ExecutorInner {
                config,
                state: Mutex::new(state),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                dispatcher: EventDispatcher::with_events(
                    EventKind::ALL.into_iter().map(EventKind::as_str),
                ),
            }),
        }
    }

    /// Seed the executor with units
    pub fn with_units<I>(self, units: I) -> ExecutorResult<Self>
    where
        I: IntoIterator<Item = Unit<T, E>>,
    {
        self.extend(units)?;
        Ok(self)
    }

    /// Get the current configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// The concurrency limit
    pub fn limit(&self) -> Limit {
        self.inner.config.limit
    }

    /// Number of queued units
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a run is in progress and has not been cancelled
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire) && !self.inner.state.lock().batch.is_cancelled()
    }

    /// Queue a unit of work, returning its index in the batch.
    ///
    /// Units cannot be added while a run is in progress.
    pub fn add(&self, unit: Unit<T, E>) -> ExecutorResult<usize> {
        if self.inner.running.load(Ordering::Acquire) {
            return Err(ExecutorError::ExecutorBusy);
        }
        let future = unit.into_future()?;

        let mut state = self.inner.state.lock();
        let index = state.next_index;
        state.next_index += 1;
        state.queue.push_back(TaskRecord::new(index, future));
        trace!(index, "unit queued");
        Ok(index)
    }

    /// Queue a factory producing the unit's future
    pub fn add_fn<F, Fut>(&self, factory: F) -> ExecutorResult<usize>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.add(Unit::deferred(factory))
    }

    /// Queue an already created future
    pub fn add_future<Fut>(&self, future: Fut) -> ExecutorResult<usize>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.add(Unit::started(future))
    }

    /// Queue several units, stopping at the first invalid one
    pub fn extend<I>(&self, units: I) -> ExecutorResult<()>
    where
        I: IntoIterator<Item = Unit<T, E>>,
    {
        for unit in units {
            self.add(unit)?;
        }
        Ok(())
    }

    /// Subscribe to one of `start`, `finish`, `task.start` or `task.finish`
    pub fn on(&self, event: impl AsRef<str>, handler: Handler<ExecutorEvent>) -> EventResult<()> {
        self.inner.dispatcher.observe(event.as_ref(), handler)
    }

    /// Remove every handler of an event
    pub fn off(&self, event: impl AsRef<str>) {
        self.inner.dispatcher.remove(event.as_ref());
    }

    /// Number of handlers subscribed to an event
    pub fn subscriber_count(&self, event: impl AsRef<str>) -> usize {
        self.inner.dispatcher.subscriber_count(event.as_ref())
    }

    /// Drop queued units that have not started yet.
    ///
    /// Units already admitted keep running to completion; the ones still
    /// waiting for a slot settle as [`TaskResult::Cancelled`].
    ///
    /// [`Executor::is_running`] reports `false` right away, but the batch
    /// itself only closes once its admitted units have drained: until then
    /// [`Executor::run`] is refused and [`Executor::reset`] returns
    /// [`ExecutorError::ExecutorBusy`].
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.queue.len();
        state.queue.clear();
        state.batch.cancel();
        info!(dropped, "executor cancelled");
    }

    /// Clear the queue and the subscribers and rebuild the gate.
    ///
    /// Fails with [`ExecutorError::ExecutorBusy`] while a batch is open, which
    /// includes a cancelled batch whose admitted units are still running.
    pub fn reset(&self) -> ExecutorResult<()> {
        if self.inner.running.load(Ordering::Acquire) {
            return Err(ExecutorError::ExecutorBusy);
        }
        self.inner.reset_state();
        Ok(())
    }

    /// Run every queued unit as one batch.
    ///
    /// Returns the units that settled in `completed` and, when the batch timed
    /// out or returned early, the ones still running in `pending`. Without
    /// `return_exceptions`, the first failing unit aborts the batch and its
    /// error is returned as [`RunError::Unit`]. After every run the executor is
    /// reset and can be used for a new batch.
    pub async fn run(&self, options: RunOptions) -> Result<RunOutput<T, E>, RunError<E>> {
        let policy = RunPolicy::resolve(&self.inner.config, &options);

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ExecutorError::AlreadyRunning.into());
        }

        let (records, context) = {
            let mut state = self.inner.state.lock();
            state.batch = CancellationToken::new();
            let context = BatchContext {
                gate: state.gate.clone(),
                token: state.batch.clone(),
                generation: self.inner.generation.load(Ordering::Acquire),
                capture: policy.capture,
            };
            (std::mem::take(&mut state.queue), context)
        };

        if records.is_empty() {
            self.inner.running.store(false, Ordering::Release);
            if policy.ignore_empty {
                debug!("no units to run, returning empty output");
                return Ok(RunOutput::empty());
            }
            return Err(ExecutorError::EmptyQueue.into());
        }

        let guard = RunGuard { inner: &*self.inner };
        let limit = self.inner.config.limit;
        let queued = records.len();
        let started = Instant::now();
        let deadline = policy.timeout.map(|timeout| started + timeout);

        let batch = match self
            .inner
            .dispatcher
            .trigger(
                EventKind::Start.as_str(),
                ExecutorEvent::Started {
                    queued,
                    limit: limit.as_usize(),
                },
            )
            .await
        {
            Err(err) => Batch::failed(err.into()),
            Ok(()) if limit.is_sequential() => {
                debug!(queued, "running batch sequentially");
                self.run_sequentially(records, context, deadline).await
            }
            Ok(()) => {
                debug!(queued, limit = limit.as_usize(), "running batch concurrently");
                self.run_concurrently(records, context, deadline, policy.return_when)
                    .await
            }
        };

        let finished = self
            .inner
            .dispatcher
            .trigger(
                EventKind::Finish.as_str(),
                ExecutorEvent::Finished {
                    completed: batch.completed.len(),
                    pending: batch.pending.len(),
                    duration: started.elapsed(),
                },
            )
            .await;
        drop(guard);

        if let Some(failure) = batch.failure {
            error!(error = ?failure, "batch aborted");
            return Err(failure);
        }
        finished?;

        Ok(RunOutput {
            completed: batch.completed,
            pending: batch.pending,
        })
    }

    /// Wrap a record so it waits for a gate slot and checks the batch token
    /// before starting.
    fn schedule(&self, record: TaskRecord<T, E>, context: BatchContext) -> Tracked<T, E> {
        let inner = Arc::clone(&self.inner);
        let index = record.index();
        let future = async move {
            let _permit = match context.gate.clone() {
                Some(gate) => {
                    tokio::select! {
                        biased;
                        _ = context.token.cancelled() => return Settled::cancelled(index),
                        permit = gate.acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => return Settled::cancelled(index),
                        },
                    }
                }
                None => None,
            };
            if context.token.is_cancelled() {
                trace!(index, "batch closed before admission");
                return Settled::cancelled(index);
            }

            let outcome = inner.execute(index, record.future, &context).await;
            Settled { index, outcome }
        }
        .boxed();
        Tracked { index, future }
    }

    async fn run_sequentially(
        &self,
        records: VecDeque<TaskRecord<T, E>>,
        context: BatchContext,
        deadline: Option<Instant>,
    ) -> Batch<T, E> {
        let mut batch = Batch::new();
        let mut records = records.into_iter();

        while let Some(record) = records.next() {
            if context.token.is_cancelled() {
                trace!(index = record.index(), "batch cancelled, unit skipped");
                batch.completed.push(CompletedTask {
                    index: record.index(),
                    result: TaskResult::Cancelled,
                });
                continue;
            }

            let mut task = self.schedule(record, context.clone());
            let settled = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, &mut task).await {
                    Ok(settled) => settled,
                    Err(_) => {
                        warn!(index = task.index, "batch deadline reached");
                        context.token.cancel();
                        batch.pending.push(task.detach());
                        for record in records {
                            batch
                                .pending
                                .push(self.schedule(record, context.clone()).detach());
                        }
                        return batch;
                    }
                },
                None => task.await,
            };

            match settled.outcome {
                Ok(result) => batch.completed.push(CompletedTask {
                    index: settled.index,
                    result,
                }),
                Err(failure) => {
                    context.token.cancel();
                    batch.failure = Some(failure.into_run_error(settled.index));
                    return batch;
                }
            }
        }
        batch
    }

    async fn run_concurrently(
        &self,
        records: VecDeque<TaskRecord<T, E>>,
        context: BatchContext,
        deadline: Option<Instant>,
        return_when: ReturnWhen,
    ) -> Batch<T, E> {
        let mut batch = Batch::new();
        let mut in_flight: FuturesUnordered<Tracked<T, E>> = records
            .into_iter()
            .map(|record| self.schedule(record, context.clone()))
            .collect();
        let mut expiry = deadline.map(|deadline| Box::pin(tokio::time::sleep_until(deadline)));

        loop {
            let next = match expiry.as_mut() {
                Some(expiry) => tokio::select! {
                    settled = in_flight.next() => settled,
                    _ = expiry.as_mut() => {
                        warn!(pending = in_flight.len(), "batch deadline reached");
                        context.token.cancel();
                        break;
                    }
                },
                None => in_flight.next().await,
            };
            let Some(settled) = next else {
                break;
            };

            match settled.outcome {
                Ok(result) => {
                    let failed = result.is_error();
                    batch.completed.push(CompletedTask {
                        index: settled.index,
                        result,
                    });
                    let stop = match return_when {
                        ReturnWhen::AllCompleted => false,
                        ReturnWhen::FirstCompleted => true,
                        ReturnWhen::FirstException => failed,
                    };
                    if stop {
                        debug!(?return_when, "returning before the batch settled");
                        break;
                    }
                }
                Err(failure) => {
                    // No new unit is admitted; units already running finish detached.
                    context.token.cancel();
                    batch.failure = Some(failure.into_run_error(settled.index));
                    for task in in_flight {
                        drop(task.detach());
                    }
                    return batch;
                }
            }
        }

        batch
            .pending
            .extend(in_flight.into_iter().map(Tracked::detach));
        batch
    }
}
