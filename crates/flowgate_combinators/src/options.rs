//! Options shared by the combinators and the batch helper they run through

use std::fmt::Debug;
use std::time::Duration;

use flowgate::{Executor, Limit, RunError, RunOptions, RunOutput};

use crate::error::{FlowError, FlowResult};

/// Concurrency limit and deadline of a combinator call.
///
/// The default admits every unit at once and never times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowOptions {
    pub limit: Limit,
    pub timeout: Option<Duration>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            limit: Limit::None,
            timeout: None,
        }
    }
}

impl FlowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options running one unit at a time
    pub fn sequential() -> Self {
        Self {
            limit: Limit::SEQUENTIAL,
            timeout: None,
        }
    }

    /// Set the concurrency limit, `0` meaning unbounded
    pub fn with_limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Give up on the whole call after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn executor<T, E>(&self) -> Executor<T, E>
    where
        T: Send + 'static,
        E: Debug + Send + 'static,
    {
        Executor::new(self.limit)
    }

    /// Run options for a batch where an empty input is not an error.
    pub(crate) fn run_options(&self) -> RunOptions {
        let options = RunOptions::new().with_ignore_empty(true);
        match self.timeout {
            Some(timeout) => options.with_timeout(timeout),
            None => options,
        }
    }
}

/// Run a batch and require every unit to settle.
///
/// Units still running when the deadline hits are aborted and the call
/// fails with [`FlowError::Timeout`].
pub(crate) async fn run_batch<T, E>(
    executor: &Executor<T, E>,
    options: RunOptions,
) -> FlowResult<RunOutput<T, E>, E>
where
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let timeout = options.timeout;
    let output = executor.run(options).await?;
    if output.is_complete() {
        return Ok(output);
    }

    abort_pending(&output);
    Err(FlowError::Timeout {
        duration: timeout.unwrap_or_default(),
    })
}

/// Report a unit failure of a one-unit batch at the iteration it ran in.
pub(crate) fn at_iteration<E>(err: RunError<E>, iteration: usize) -> RunError<E> {
    match err {
        RunError::Unit { source, .. } => RunError::unit(iteration, source),
        other => other,
    }
}

pub(crate) fn abort_pending<T, E>(output: &RunOutput<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    if !output.pending.is_empty() {
        tracing::debug!(pending = output.pending.len(), "aborting unsettled units");
    }
    for task in &output.pending {
        task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_unbounded() {
        let options = FlowOptions::default();
        assert_eq!(options.limit.resolve(), None);
        assert_eq!(options.timeout, None);
        assert!(FlowOptions::sequential().limit.is_sequential());
    }

    #[test]
    fn test_run_options_carry_the_deadline() {
        let options = FlowOptions::new()
            .with_limit(3)
            .with_timeout(Duration::from_secs(1));
        assert_eq!(options.limit, Limit::from(3));

        let run = options.run_options();
        assert_eq!(run.timeout, Some(Duration::from_secs(1)));
        assert_eq!(run.ignore_empty, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_batch_turns_pending_into_timeout() {
        let options = FlowOptions::new().with_timeout(Duration::from_millis(50));
        let executor: Executor<u32, String> = options.executor();
        executor.add_future(async { Ok(1) }).unwrap();
        executor
            .add_future(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(2)
            })
            .unwrap();

        let err = run_batch(&executor, options.run_options())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Timeout { duration } if duration == Duration::from_millis(50)
        ));
    }
}
