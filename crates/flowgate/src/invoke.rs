//! Capture-or-propagate policy shared by both scheduling strategies.

use std::future::Future;

use crate::task::TaskResult;

/// Runs a unit of work and applies the failure policy.
///
/// On success the value is returned as [`TaskResult::Success`]. On failure the
/// error is returned as [`TaskResult::Error`] when `capture_errors` is set,
/// otherwise it is propagated as `Err`.
pub async fn safe_invoke<F, T, E>(unit: F, capture_errors: bool) -> Result<TaskResult<T, E>, E>
where
    F: Future<Output = Result<T, E>>,
{
    match unit.await {
        Ok(output) => Ok(TaskResult::Success(output)),
        Err(err) if capture_errors => Ok(TaskResult::Error(err)),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_is_wrapped() {
        let result = safe_invoke(async { Ok::<_, String>(7) }, false).await;
        assert_eq!(result, Ok(TaskResult::Success(7)));
    }

    #[tokio::test]
    async fn test_failure_is_captured() {
        let result = safe_invoke(async { Err::<i32, _>("bad".to_string()) }, true).await;
        assert_eq!(result, Ok(TaskResult::Error("bad".to_string())));
    }

    #[tokio::test]
    async fn test_failure_is_propagated() {
        let result = safe_invoke(async { Err::<i32, _>("bad".to_string()) }, false).await;
        assert_eq!(result, Err("bad".to_string()));
    }
}
