//! Apply an async function to every item of a collection

use std::fmt::Debug;
use std::future::Future;

use flowgate::Executor;

use crate::error::FlowResult;
use crate::options::{run_batch, FlowOptions};

/// Run `f` for every item, discarding the produced values.
///
/// The first failing call aborts the rest of the batch and its error is
/// returned.
pub async fn each<I, F, Fut, T, E>(f: F, items: I, options: FlowOptions) -> FlowResult<(), E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let executor: Executor<T, E> = options.executor();
    queue(&executor, f, items)?;
    run_batch(&executor, options.run_options()).await?;
    Ok(())
}

/// Run `f` for every item, collecting the values in input order.
///
/// # Example
///
/// ```rust
/// use flowgate_combinators::{map, FlowOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let doubled = map(
///     |n: u32| async move { Ok::<_, std::io::Error>(n * 2) },
///     [1, 2, 3],
///     FlowOptions::new().with_limit(2),
/// )
/// .await
/// .unwrap();
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # }
/// ```
pub async fn map<I, F, Fut, T, E>(f: F, items: I, options: FlowOptions) -> FlowResult<Vec<T>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let executor: Executor<T, E> = options.executor();
    queue(&executor, f, items)?;
    let output = run_batch(&executor, options.run_options()).await?;
    Ok(output.into_values())
}

fn queue<I, F, Fut, T, E>(executor: &Executor<T, E>, mut f: F, items: I) -> flowgate::ExecutorResult<()>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    for item in items {
        executor.add_future(f(item))?;
    }
    Ok(())
}
