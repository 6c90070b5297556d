//! Per-future deadline

use std::future::Future;
use std::time::Duration;

use flowgate::RunError;

use crate::error::{FlowError, FlowResult};

/// Await `future` for at most `duration`.
///
/// The future is dropped when the deadline passes. Its own error is reported
/// as the failure of unit `0`.
pub async fn timeout<Fut, T, E>(future: Fut, duration: Duration) -> FlowResult<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(RunError::unit(0, err).into()),
        Err(_) => {
            tracing::debug!(?duration, "future timed out");
            Err(FlowError::Timeout { duration })
        }
    }
}
