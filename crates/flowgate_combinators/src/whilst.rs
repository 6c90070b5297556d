//! Call an async function while, or until, an async test holds

use std::fmt::Debug;
use std::future::Future;

use flowgate::{Executor, Limit, RunError, RunOptions};

use crate::error::FlowResult;
use crate::options::at_iteration;

/// Call `task` as long as `condition` resolves to `true`, collecting the values.
///
/// The condition is checked before every call. A failing call, or a failing
/// condition, stops the loop; its error is reported at the iteration it
/// happened in.
pub async fn whilst<F, Fut, C, CFut, T, E>(task: F, condition: C) -> FlowResult<Vec<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<bool, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    repeat_while(task, condition, true).await
}

/// Call `task` until `condition` resolves to `true`, collecting the values.
///
/// The inverse of [`whilst`].
pub async fn until<F, Fut, C, CFut, T, E>(task: F, condition: C) -> FlowResult<Vec<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<bool, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    repeat_while(task, condition, false).await
}

async fn repeat_while<F, Fut, C, CFut, T, E>(
    mut task: F,
    mut condition: C,
    expected: bool,
) -> FlowResult<Vec<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<bool, E>>,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    // One call per batch; the executor resets itself after every run.
    let executor: Executor<T, E> = Executor::new(Limit::SEQUENTIAL);
    let mut values = Vec::new();

    loop {
        let iteration = values.len();
        let verdict = condition()
            .await
            .map_err(|err| RunError::unit(iteration, err))?;
        if verdict != expected {
            break;
        }

        executor.add_future(task())?;
        let output = executor
            .run(RunOptions::new())
            .await
            .map_err(|err| at_iteration(err, iteration))?;
        values.extend(output.into_values());
    }

    tracing::trace!(iterations = values.len(), expected, "loop settled");
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::FlowError;

    fn counting(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, String>> {
        let calls = Arc::clone(calls);
        move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn calls_above(
        calls: &Arc<AtomicUsize>,
        bound: usize,
    ) -> impl FnMut() -> std::future::Ready<Result<bool, String>> {
        let calls = Arc::clone(calls);
        move || std::future::ready(Ok(calls.load(Ordering::SeqCst) > bound))
    }

    #[tokio::test]
    async fn test_whilst_collects_while_condition_holds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let below_four = {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move { Ok::<_, String>(calls.load(Ordering::SeqCst) < 4) }
            }
        };

        let values = whilst(counting(&calls), below_four).await.unwrap();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_until_stops_once_condition_holds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let values = until(counting(&calls), calls_above(&calls, 4)).await.unwrap();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_condition_checked_before_first_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let values = whilst(counting(&calls), calls_above(&calls, 10)).await.unwrap();
        assert!(values.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_call_stops_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = {
            let calls = Arc::clone(&calls);
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call == 3 {
                        Err(format!("call {call} failed"))
                    } else {
                        Ok(call)
                    }
                }
            }
        };

        let err = until(task, calls_above(&calls, 10)).await.unwrap_err();
        assert!(matches!(
            &err,
            FlowError::Run(RunError::Unit { index: 2, .. })
        ));
        assert_eq!(err.into_unit_error(), Some("call 3 failed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failing_condition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let condition = || async { Err::<bool, _>("no verdict".to_string()) };
        let err = whilst(counting(&calls), condition).await.unwrap_err();
        assert_eq!(err.unit_error().map(String::as_str), Some("no verdict"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
