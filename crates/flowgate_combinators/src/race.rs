//! First unit to succeed wins

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowgate::{CompletedTask, Executor, Limit, ReturnWhen, RunError, RunOptions, TaskResult, Unit};

use crate::error::{FlowError, FlowResult};
use crate::options::abort_pending;

/// Run every unit at once and resolve with the first one to succeed.
///
/// Failing units drop out of the race; the remaining units are aborted as
/// soon as one succeeds. When every unit fails, the error of the last one to
/// fail is returned. An empty input resolves to `None`.
pub async fn race<I, T, E>(units: I, timeout: Option<Duration>) -> FlowResult<Option<T>, E>
where
    I: IntoIterator<Item = Unit<T, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let futures = units
        .into_iter()
        .map(Unit::into_future)
        .collect::<Result<Vec<_>, _>>()?;
    if futures.is_empty() {
        return Ok(None);
    }

    let contenders = Arc::new(AtomicUsize::new(futures.len()));
    let executor: Executor<T, E> = Executor::new(Limit::None);
    for future in futures {
        let contenders = Arc::clone(&contenders);
        executor.add_future(async move {
            match future.await {
                Ok(value) => Ok(value),
                // The last contender to fail settles the race.
                Err(err) if contenders.fetch_sub(1, Ordering::AcqRel) == 1 => Err(err),
                Err(err) => {
                    tracing::trace!(error = ?err, "contender dropped out of the race");
                    std::future::pending().await
                }
            }
        })?;
    }

    let mut options = RunOptions::new()
        .with_return_exceptions(true)
        .with_return_when(ReturnWhen::FirstCompleted);
    if let Some(timeout) = timeout {
        options = options.with_timeout(timeout);
    }

    let output = executor.run(options).await?;
    abort_pending(&output);

    match output.completed.into_iter().next() {
        Some(CompletedTask {
            result: TaskResult::Success(value),
            ..
        }) => Ok(Some(value)),
        Some(CompletedTask {
            index,
            result: TaskResult::Error(err),
        }) => Err(RunError::unit(index, err).into()),
        Some(CompletedTask {
            result: TaskResult::Cancelled,
            ..
        }) => Ok(None),
        None => Err(FlowError::Timeout {
            duration: timeout.unwrap_or_default(),
        }),
    }
}
