//! Error types for the flowgate executor

use std::time::Duration;

use thiserror::Error;

/// Error returned by an event handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Usage errors raised synchronously by the executor.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("invalid unit of work: {reason}")]
    InvalidUnit { reason: String },

    #[error("executor is already running")]
    AlreadyRunning,

    #[error("set of units to schedule is empty")]
    EmptyQueue,

    #[error("executor is still running")]
    ExecutorBusy,
}

/// Errors raised by the event dispatcher.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("cannot observe unknown event `{event}`")]
    InvalidHandler { event: String },

    #[error("handler for event `{event}` failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: HandlerError,
    },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid timeout duration: {duration:?} (must be > 0)")]
    InvalidTimeout { duration: Duration },
}

/// Error returned by [`Executor::run`](crate::Executor::run).
///
/// `E` is the error type produced by the units of work; it is carried
/// verbatim in [`RunError::Unit`].
#[derive(Error, Debug)]
pub enum RunError<E> {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("unit {index} failed")]
    Unit {
        index: usize,
        #[source]
        source: E,
    },
}

/// Result type alias for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Result type alias for event dispatching
pub type EventResult<T> = Result<T, EventError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ExecutorError {
    /// Create an invalid unit error
    pub fn invalid_unit<S: Into<String>>(reason: S) -> Self {
        ExecutorError::InvalidUnit {
            reason: reason.into(),
        }
    }
}

impl EventError {
    /// Create an invalid handler error
    pub fn invalid_handler<S: Into<String>>(event: S) -> Self {
        EventError::InvalidHandler {
            event: event.into(),
        }
    }

    /// Wrap the error returned by a handler
    pub fn handler<S: Into<String>>(event: S, source: HandlerError) -> Self {
        EventError::Handler {
            event: event.into(),
            source,
        }
    }
}

impl ConfigError {
    /// Create an invalid timeout error
    pub fn invalid_timeout(duration: Duration) -> Self {
        ConfigError::InvalidTimeout { duration }
    }
}

impl<E> RunError<E> {
    /// Create a unit failure error
    pub fn unit(index: usize, source: E) -> Self {
        RunError::Unit { index, source }
    }

    /// Returns the unit's own error, if this is a unit failure.
    pub fn into_unit_error(self) -> Option<E> {
        match self {
            RunError::Unit { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the unit's own error by reference, if this is a unit failure.
    pub fn unit_error(&self) -> Option<&E> {
        match self {
            RunError::Unit { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Check if the run was rejected because the queue was empty
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, RunError::Executor(ExecutorError::EmptyQueue))
    }

    /// Check if the run was rejected because another run was active
    pub fn is_already_running(&self) -> bool {
        matches!(self, RunError::Executor(ExecutorError::AlreadyRunning))
    }

    /// Check if an event handler aborted the run
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, RunError::Event(EventError::Handler { .. }))
    }
}
