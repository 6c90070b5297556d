//! Keep or drop items based on an async predicate

use std::fmt::Debug;
use std::future::Future;

use flowgate::{Executor, Limit, TaskResult};

use crate::error::FlowResult;
use crate::options::{run_batch, FlowOptions};

/// Keep the items whose predicate resolves to `true`, in input order.
pub async fn filter<I, F, Fut, E>(
    predicate: F,
    items: I,
    options: FlowOptions,
) -> FlowResult<Vec<I::Item>, E>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    let verdicts = evaluate(predicate, items, options).await?;
    Ok(verdicts
        .into_iter()
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect())
}

/// Keep the items whose predicate resolves to `false`, in input order.
pub async fn filter_false<I, F, Fut, E>(
    predicate: F,
    items: I,
    options: FlowOptions,
) -> FlowResult<Vec<I::Item>, E>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    let verdicts = evaluate(predicate, items, options).await?;
    Ok(verdicts
        .into_iter()
        .filter_map(|(item, keep)| (!keep).then_some(item))
        .collect())
}

/// Drop items while the predicate holds, then return every remaining item.
///
/// Predicates are evaluated one at a time.
pub async fn dropwhile<I, F, Fut, E>(predicate: F, items: I) -> FlowResult<Vec<I::Item>, E>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    let options = FlowOptions::new().with_limit(Limit::SEQUENTIAL);
    let verdicts = evaluate(predicate, items, options).await?;
    Ok(verdicts
        .into_iter()
        .skip_while(|(_, drop)| *drop)
        .map(|(item, _)| item)
        .collect())
}

/// Pair every item with its predicate verdict.
async fn evaluate<I, F, Fut, E>(
    mut predicate: F,
    items: I,
    options: FlowOptions,
) -> FlowResult<Vec<(I::Item, bool)>, E>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Debug + Send + 'static,
{
    let items: Vec<I::Item> = items.into_iter().collect();
    let executor: Executor<bool, E> = options.executor();
    for item in &items {
        executor.add_future(predicate(item))?;
    }

    let verdicts = run_batch(&executor, options.run_options())
        .await?
        .into_ordered();
    Ok(items
        .into_iter()
        .zip(verdicts)
        .map(|(item, verdict)| (item, matches!(verdict, Some(TaskResult::Success(true)))))
        .collect())
}
