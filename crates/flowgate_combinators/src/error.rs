//! Error type shared by the combinators

use std::time::Duration;

use flowgate::{ExecutorError, RunError};
use thiserror::Error;

/// Error returned by the combinators.
///
/// `E` is the error type of the units (or predicates, reducers, ...) the
/// combinator runs.
#[derive(Error, Debug)]
pub enum FlowError<E> {
    #[error(transparent)]
    Run(#[from] RunError<E>),

    #[error("deadline of {duration:?} elapsed before every unit settled")]
    Timeout { duration: Duration },
}

/// Result type alias for combinators
pub type FlowResult<T, E> = Result<T, FlowError<E>>;

impl<E> From<ExecutorError> for FlowError<E> {
    fn from(err: ExecutorError) -> Self {
        FlowError::Run(RunError::Executor(err))
    }
}

impl<E> FlowError<E> {
    /// Check if the combinator gave up because of its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, FlowError::Timeout { .. })
    }

    /// Returns the error produced by a unit, if any
    pub fn unit_error(&self) -> Option<&E> {
        match self {
            FlowError::Run(err) => err.unit_error(),
            FlowError::Timeout { .. } => None,
        }
    }

    /// Consume the error, returning the one produced by a unit, if any
    pub fn into_unit_error(self) -> Option<E> {
        match self {
            FlowError::Run(err) => err.into_unit_error(),
            FlowError::Timeout { .. } => None,
        }
    }
}
