//! Sequential async fold

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use flowgate::{Executor, ExecutorError, Limit, RunOptions};
use parking_lot::Mutex;

use crate::error::{FlowError, FlowResult};

/// Fold the items with an async reducer, one item at a time.
///
/// With `right` set, the items are folded from the last to the first. An
/// empty input resolves to `initial`. There is no concurrency limit to pick:
/// every call consumes the accumulator produced by the previous one.
pub async fn reduce<I, F, Fut, A, E>(reducer: F, items: I, initial: A, right: bool) -> FlowResult<A, E>
where
    I: IntoIterator,
    I::Item: Send + 'static,
    F: Fn(A, I::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
    A: Send + 'static,
    E: Debug + Send + 'static,
{
    let mut items: Vec<I::Item> = items.into_iter().collect();
    if items.is_empty() {
        return Ok(initial);
    }
    if right {
        items.reverse();
    }

    let reducer = Arc::new(reducer);
    let accumulator = Arc::new(Mutex::new(Some(initial)));
    let executor: Executor<(), E> = Executor::new(Limit::SEQUENTIAL);

    for item in items {
        let reducer = Arc::clone(&reducer);
        let accumulator = Arc::clone(&accumulator);
        executor.add_future(async move {
            let current = accumulator.lock().take();
            let Some(current) = current else {
                return Ok(());
            };
            let next = (*reducer)(current, item).await?;
            *accumulator.lock() = Some(next);
            Ok::<(), E>(())
        })?;
    }

    executor.run(RunOptions::new()).await?;
    let folded = accumulator.lock().take();
    folded.ok_or_else(|| FlowError::from(ExecutorError::EmptyQueue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reduce_sums() {
        let sum = reduce(
            |acc: i64, n: i64| async move { Ok::<_, String>(acc + n) },
            1..=10,
            0,
            false,
        )
        .await
        .unwrap();
        assert_eq!(sum, 55);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reduce_direction() {
        let concat = |acc: String, part: &'static str| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, String>(acc + part)
        };

        let left = reduce(concat, vec!["a", "b", "c"], String::new(), false)
            .await
            .unwrap();
        let right = reduce(concat, vec!["a", "b", "c"], String::new(), true)
            .await
            .unwrap();
        assert_eq!(left, "abc");
        assert_eq!(right, "cba");
    }

    #[tokio::test]
    async fn test_reduce_empty_and_error() {
        let untouched = reduce(
            |acc: i32, n: i32| async move { Ok::<_, String>(acc * n) },
            Vec::new(),
            7,
            false,
        )
        .await
        .unwrap();
        assert_eq!(untouched, 7);

        let err = reduce(
            |acc: i32, n: i32| async move {
                if n == 0 {
                    Err("division by zero".to_string())
                } else {
                    Ok(acc / n)
                }
            },
            vec![2, 0, 1],
            100,
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_unit_error(), Some("division by zero".to_string()));
    }
}
