//! Call an async function periodically in the background

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use flowgate::{Executor, Limit, RunOptions};
use tokio::task::JoinHandle;

use crate::error::FlowResult;
use crate::options::at_iteration;

/// Spawn a task calling `task`, then sleeping for `period`, `times` times.
///
/// `None` (or `Some(0)`) keeps calling until the returned handle is aborted.
/// The handle resolves to the number of calls made; a failing call ends the
/// schedule and its error is reported at the call it happened in.
pub fn interval<F, Fut, T, E>(
    mut task: F,
    period: Duration,
    times: Option<usize>,
) -> JoinHandle<FlowResult<usize, E>>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let times = times.filter(|&times| times > 0);
    tokio::spawn(async move {
        let executor: Executor<T, E> = Executor::new(Limit::SEQUENTIAL);
        let mut calls = 0;
        while times.map_or(true, |times| calls < times) {
            executor.add_future(task())?;
            executor
                .run(RunOptions::new())
                .await
                .map_err(|err| at_iteration(err, calls))?;
            calls += 1;
            tracing::trace!(calls, "interval tick");
            tokio::time::sleep(period).await;
        }
        Ok(calls)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    fn ticking(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<(), String>> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_runs_the_requested_times() {
        let counter = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let calls = interval(ticking(&counter), Duration::from_millis(100), Some(3))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_interval_until_aborted() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = interval(ticking(&counter), Duration::from_millis(100), Some(0));

        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_call_ends_the_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = {
            let counter = Arc::clone(&counter);
            move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 1 {
                        Err("tick failed".to_string())
                    } else {
                        Ok(call)
                    }
                }
            }
        };

        let err = interval(task, Duration::from_millis(10), None)
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            &err,
            crate::FlowError::Run(flowgate::RunError::Unit { index: 1, .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
