//! Units of work, task records and task outcomes

use std::any::Any;
use std::fmt::{self, Debug};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::future::{BoxFuture, FutureExt};

use crate::error::{ExecutorError, ExecutorResult};

/// A boxed, started unit of work.
pub type UnitFuture<T, E> = BoxFuture<'static, Result<T, E>>;

type UnitFactory<T, E> = Box<dyn FnOnce() -> UnitFuture<T, E> + Send>;

/// A unit of work submitted to an [`Executor`](crate::Executor).
///
/// A unit is either a factory that still has to be called to produce its
/// future, or a future that has already been created. Factories are called
/// when the unit is added to the executor; the resulting future is not polled
/// until the executor admits it.
pub enum Unit<T, E> {
    /// A factory producing the unit's future.
    Pending(UnitFactory<T, E>),
    /// An already created future.
    Started(UnitFuture<T, E>),
}

impl<T, E> Unit<T, E> {
    /// Create a unit from a zero-argument factory
    pub fn deferred<F, Fut>(factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Unit::Pending(Box::new(move || factory().boxed()))
    }

    /// Create a unit from a function and the arguments it is called with
    pub fn call<F, A, Fut>(function: F, args: A) -> Self
    where
        F: FnOnce(A) -> Fut + Send + 'static,
        A: Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::deferred(move || function(args))
    }

    /// Create a unit from an already created future
    pub fn started<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Unit::Started(future.boxed())
    }

    /// Whether the unit's future has already been created.
    pub fn is_started(&self) -> bool {
        matches!(self, Unit::Started(_))
    }

    /// Normalize the unit into its future, calling the factory if needed.
    ///
    /// A factory that panics did not produce a unit of work and is reported
    /// as [`ExecutorError::InvalidUnit`].
    pub fn into_future(self) -> ExecutorResult<UnitFuture<T, E>> {
        match self {
            Unit::Started(future) => Ok(future),
            Unit::Pending(factory) => panic::catch_unwind(AssertUnwindSafe(factory))
                .map_err(|payload| ExecutorError::invalid_unit(panic_message(payload.as_ref()))),
        }
    }
}

impl<T, E> Debug for Unit<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Pending(_) => f.write_str("Unit::Pending"),
            Unit::Started(_) => f.write_str("Unit::Started"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("factory panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("factory panicked: {message}")
    } else {
        "factory panicked".to_string()
    }
}

/// A queued unit of work paired with its submission index.
pub struct TaskRecord<T, E> {
    index: usize,
    pub(crate) future: UnitFuture<T, E>,
}

impl<T, E> TaskRecord<T, E> {
    pub(crate) fn new(index: usize, future: UnitFuture<T, E>) -> Self {
        Self { index, future }
    }

    /// Position of the task in submission order within its batch.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T, E> Debug for TaskRecord<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Result of executing a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult<T, E> {
    /// Task completed successfully with output
    Success(T),
    /// Task failed with error (only produced when errors are captured)
    Error(E),
    /// Task was never started because its batch was cancelled or closed
    Cancelled,
}

impl<T, E> TaskResult<T, E> {
    /// Convert to a standard Result, treating cancellation as an error
    pub fn into_result(self) -> Result<T, TaskError<E>> {
        match self {
            TaskResult::Success(output) => Ok(output),
            TaskResult::Error(err) => Err(TaskError::Execution(err)),
            TaskResult::Cancelled => Err(TaskError::Cancelled),
        }
    }

    /// Returns the success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            TaskResult::Success(output) => Some(output),
            _ => None,
        }
    }

    /// Check if the result is successful
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }

    /// Check if the result is an error
    pub fn is_error(&self) -> bool {
        matches!(self, TaskResult::Error(_))
    }

    /// Check if the result is cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskResult::Cancelled)
    }
}

impl<T, E> From<Result<T, E>> for TaskResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(output) => TaskResult::Success(output),
            Err(err) => TaskResult::Error(err),
        }
    }
}

/// Error types for task execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError<E> {
    #[error("Task execution failed: {0}")]
    Execution(E),
    #[error("Task was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deferred_unit_is_normalized() {
        let unit: Unit<i32, String> = Unit::call(|x: i32| async move { Ok(x * 2) }, 21);
        assert!(!unit.is_started());

        let future = unit.into_future().unwrap();
        assert_eq!(future.await, Ok(42));
    }

    #[tokio::test]
    async fn test_started_unit_passes_through() {
        let unit: Unit<i32, String> = Unit::started(async { Err("nope".to_string()) });
        assert!(unit.is_started());
        assert_eq!(unit.into_future().unwrap().await, Err("nope".to_string()));
    }

    #[test]
    fn test_panicking_factory_is_invalid() {
        let unit: Unit<i32, String> =
            Unit::Pending(Box::new(|| -> UnitFuture<i32, String> { panic!("no future for you") }));
        let err = unit.into_future().err().unwrap();
        if let ExecutorError::InvalidUnit { reason } = err {
            assert_eq!(reason, "factory panicked: no future for you");
        } else {
            panic!("Expected invalid unit error");
        }
    }

    #[test]
    fn test_task_result_conversions() {
        let success_result: TaskResult<i32, String> = TaskResult::Success(42);
        assert!(success_result.is_success());
        assert_eq!(success_result.into_result(), Ok(42));

        let error_result: TaskResult<i32, String> = Err("failed".to_string()).into();
        assert!(error_result.is_error());
        assert_eq!(
            error_result.into_result(),
            Err(TaskError::Execution("failed".to_string()))
        );

        let cancelled_result: TaskResult<i32, String> = TaskResult::Cancelled;
        assert!(cancelled_result.is_cancelled());
        assert!(cancelled_result.clone().success().is_none());
        assert_eq!(cancelled_result.into_result(), Err(TaskError::Cancelled));
    }
}
