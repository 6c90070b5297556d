//! Short-circuiting existential and universal tests

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flowgate::Executor;

use crate::error::{FlowError, FlowResult};
use crate::options::{abort_pending, FlowOptions};

/// Whether at least one item passes the predicate.
///
/// The first passing item cancels the units that have not started yet.
pub async fn some<I, F, Fut, E>(predicate: F, items: I, options: FlowOptions) -> FlowResult<bool, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    short_circuit(predicate, items, options, true).await
}

/// Whether every item passes the predicate.
///
/// The first failing item cancels the units that have not started yet. With
/// [`FlowOptions::sequential`], items are tested one at a time and nothing
/// after the first failing item is tested.
pub async fn every<I, F, Fut, E>(predicate: F, items: I, options: FlowOptions) -> FlowResult<bool, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    short_circuit(predicate, items, options, false).await.map(|found| !found)
}

/// Returns `true` once a unit's verdict equals `expected`.
async fn short_circuit<I, F, Fut, E>(
    mut predicate: F,
    items: I,
    options: FlowOptions,
    expected: bool,
) -> FlowResult<bool, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    let found = Arc::new(AtomicBool::new(false));
    let executor: Executor<(), E> = options.executor();

    for item in items {
        let check = predicate(item);
        let found = Arc::clone(&found);
        let handle = executor.clone();
        executor.add_future(async move {
            if found.load(Ordering::Acquire) {
                return Ok(());
            }
            if check.await? == expected {
                found.store(true, Ordering::Release);
                handle.cancel();
            }
            Ok::<(), E>(())
        })?;
    }

    let output = executor.run(options.run_options()).await?;
    let found = found.load(Ordering::Acquire);
    if !output.is_complete() {
        abort_pending(&output);
        // A verdict reached before the deadline still stands.
        if !found {
            return Err(FlowError::Timeout {
                duration: options.timeout.unwrap_or_default(),
            });
        }
    }
    tracing::trace!(expected, found, "short circuit settled");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_some() {
        let found = some(
            |n: i32| async move { Ok::<_, String>(n > 3) },
            vec![1, 2, 3, 4, 5],
            FlowOptions::new(),
        )
        .await
        .unwrap();
        assert!(found);

        let found = some(
            |n: i32| async move { Ok::<_, String>(n > 10) },
            vec![1, 2, 3],
            FlowOptions::new(),
        )
        .await
        .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn test_every() {
        let all = every(
            |n: i32| async move { Ok::<_, String>(n > 0) },
            vec![1, 2, 3],
            FlowOptions::new().with_limit(2),
        )
        .await
        .unwrap();
        assert!(all);

        let all = every(
            |n: i32| async move { Ok::<_, String>(n != 2) },
            vec![1, 2, 3],
            FlowOptions::new(),
        )
        .await
        .unwrap();
        assert!(!all);
    }

    #[tokio::test]
    async fn test_sequential_every_stops_at_first_failure() {
        let tested = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&tested);
        let all = every(
            move |n: i32| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(n > 0)
                }
            },
            vec![1, 2, 0, 4, 5],
            FlowOptions::sequential(),
        )
        .await
        .unwrap();

        assert!(!all);
        assert_eq!(tested.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let options = FlowOptions::new();
        let never = |_: i32| async { Ok::<_, String>(true) };
        assert!(!some(never, Vec::new(), options).await.unwrap());
        assert!(every(never, Vec::new(), options).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_some_stops_admitting_units() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let found = some(
            move |n: u64| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, String>(n == 1)
                }
            },
            0..10,
            FlowOptions::new().with_limit(2),
        )
        .await
        .unwrap();

        assert!(found);
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdict_before_deadline_stands() {
        let found = some(
            |n: u64| async move {
                tokio::time::sleep(Duration::from_millis(n)).await;
                Ok::<_, String>(n == 10)
            },
            [10, 5_000],
            FlowOptions::new().with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap();
        assert!(found);

        let err = every(
            |n: u64| async move {
                tokio::time::sleep(Duration::from_millis(n)).await;
                Ok::<_, String>(true)
            },
            [10, 5_000],
            FlowOptions::new().with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }
}
