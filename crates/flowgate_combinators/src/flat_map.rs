//! Ordered map over arbitrarily nested inputs

use std::fmt::Debug;
use std::future::Future;

use crate::each::map;
use crate::error::FlowResult;
use crate::options::FlowOptions;

/// A value, or a list of further nested values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nested<T> {
    Item(T),
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// The leaf values, depth first and left to right.
    pub fn flatten(self) -> Vec<T> {
        let mut leaves = Vec::new();
        self.flatten_into(&mut leaves);
        leaves
    }

    fn flatten_into(self, leaves: &mut Vec<T>) {
        match self {
            Nested::Item(value) => leaves.push(value),
            Nested::List(items) => {
                for item in items {
                    item.flatten_into(leaves);
                }
            }
        }
    }
}

/// Run `f` for every leaf of the nested input, collecting the values in
/// depth-first order.
///
/// Leaves are scheduled as one batch, so `options.limit` bounds the number
/// of calls in flight across every nesting level.
///
/// # Example
///
/// ```rust
/// use flowgate_combinators::{flat_map, FlowOptions, Nested};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let input = vec![
///     Nested::Item(1),
///     Nested::List(vec![Nested::Item(2)]),
///     Nested::List(vec![Nested::Item(3), Nested::List(vec![Nested::Item(4)])]),
/// ];
/// let doubled = flat_map(
///     |n: u32| async move { Ok::<_, std::io::Error>(n * 2) },
///     input,
///     FlowOptions::new(),
/// )
/// .await
/// .unwrap();
/// assert_eq!(doubled, vec![2, 4, 6, 8]);
/// # }
/// ```
pub async fn flat_map<I, X, F, Fut, T, E>(
    f: F,
    items: I,
    options: FlowOptions,
) -> FlowResult<Vec<T>, E>
where
    I: IntoIterator<Item = Nested<X>>,
    F: FnMut(X) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let leaves: Vec<X> = items.into_iter().flat_map(Nested::flatten).collect();
    tracing::trace!(leaves = leaves.len(), "flattened input");
    map(f, leaves, options).await
}
