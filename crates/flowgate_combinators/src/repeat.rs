//! Call an async function a number of times

use std::fmt::Debug;
use std::future::Future;

use crate::each::map;
use crate::error::FlowResult;
use crate::options::FlowOptions;

/// Call `f` with `1, 1 + step, ...` up to `times`, one call at a time.
///
/// `times` and `step` are raised to at least one.
pub async fn repeat<F, Fut, T, E>(f: F, times: usize, step: usize) -> FlowResult<Vec<T>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Debug + Send + 'static,
{
    let counter = (1..=times.max(1)).step_by(step.max(1));
    map(f, counter, FlowOptions::sequential()).await
}
