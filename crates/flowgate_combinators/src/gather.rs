//! Run a set of units and collect their outcomes

use std::fmt::Debug;
use std::time::Duration;

use flowgate::{ReturnWhen, RunOutput, TaskResult, Unit};

use crate::error::FlowResult;
use crate::options::{run_batch, FlowOptions};

/// Run every unit and return their outcomes in submission order.
///
/// Without `return_exceptions` the first failing unit aborts the call and its
/// error is returned; with it, failures are kept as [`TaskResult::Error`] at
/// the unit's position.
pub async fn gather<I, T, E>(
    units: I,
    options: FlowOptions,
    return_exceptions: bool,
) -> FlowResult<Vec<TaskResult<T, E>>, E>
where
    I: IntoIterator<Item = Unit<T, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let executor = options.executor().with_units(units)?;
    let output = run_batch(
        &executor,
        options
            .run_options()
            .with_return_exceptions(return_exceptions),
    )
    .await?;
    Ok(output.into_ordered().into_iter().flatten().collect())
}

/// [`gather`] running one unit at a time.
pub async fn series<I, T, E>(
    units: I,
    timeout: Option<Duration>,
    return_exceptions: bool,
) -> FlowResult<Vec<TaskResult<T, E>>, E>
where
    I: IntoIterator<Item = Unit<T, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let options = FlowOptions {
        timeout,
        ..FlowOptions::sequential()
    };
    gather(units, options, return_exceptions).await
}

/// Run the units and return the raw `(completed, pending)` partition.
///
/// Unlike the other combinators, an empty input is an error
/// ([`ExecutorError::EmptyQueue`](flowgate::ExecutorError::EmptyQueue)) and
/// units still running at the deadline are handed back instead of aborted.
pub async fn wait<I, T, E>(
    units: I,
    options: FlowOptions,
    return_when: ReturnWhen,
    return_exceptions: bool,
) -> FlowResult<RunOutput<T, E>, E>
where
    I: IntoIterator<Item = Unit<T, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let executor = options.executor().with_units(units)?;
    let output = executor
        .run(
            options
                .run_options()
                .with_ignore_empty(false)
                .with_return_when(return_when)
                .with_return_exceptions(return_exceptions),
        )
        .await?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn delayed(millis: u64, value: Result<u32, String>) -> Unit<u32, String> {
        Unit::deferred(move || async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            value
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_gather_preserves_order() {
        let results = gather(
            vec![delayed(30, Ok(1)), delayed(10, Ok(2)), delayed(20, Ok(3))],
            FlowOptions::new(),
            false,
        )
        .await
        .unwrap();
        assert_eq!(
            results,
            vec![
                TaskResult::Success(1),
                TaskResult::Success(2),
                TaskResult::Success(3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gather_captures_errors() {
        let results = gather(
            vec![delayed(10, Ok(1)), delayed(5, Err("two".to_string()))],
            FlowOptions::new().with_limit(1),
            true,
        )
        .await
        .unwrap();
        assert_eq!(
            results,
            vec![TaskResult::Success(1), TaskResult::Error("two".to_string())]
        );

        let err = gather(
            vec![delayed(10, Ok(1)), delayed(5, Err("two".to_string()))],
            FlowOptions::new(),
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_unit_error(), Some("two".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_series_runs_one_at_a_time() {
        let start = Instant::now();
        let results = series(
            vec![delayed(30, Ok(1)), delayed(30, Ok(2)), delayed(30, Ok(3))],
            None,
            false,
        )
        .await
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(90));
        assert_eq!(results.len(), 3);

        let err = series(
            vec![delayed(30, Ok(1)), delayed(300, Ok(2))],
            Some(Duration::from_millis(100)),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_hands_back_pending_units() {
        let output = wait(
            vec![delayed(10, Ok(1)), delayed(500, Ok(2))],
            FlowOptions::new().with_timeout(Duration::from_millis(100)),
            ReturnWhen::AllCompleted,
            false,
        )
        .await
        .unwrap();

        assert_eq!(output.completed.len(), 1);
        let pending = output.pending.into_iter().next().unwrap();
        assert_eq!(pending.join().await, TaskResult::Success(2));
    }

    #[tokio::test]
    async fn test_wait_rejects_empty_input() {
        let err = wait(
            Vec::<Unit<u32, String>>::new(),
            FlowOptions::new(),
            ReturnWhen::AllCompleted,
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::FlowError::Run(ref run) if run.is_empty_queue()
        ));
    }
}
