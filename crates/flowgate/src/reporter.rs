//! Lifecycle events emitted by the executor
//!
//! The executor fires four events through its [`EventDispatcher`]:
//! `start`, `task.start`, `task.finish` and `finish`. This module defines their
//! names and payloads, plus a [`TracingReporter`] that forwards them to
//! `tracing`.
//!
//! [`EventDispatcher`]: crate::events::EventDispatcher

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{EventError, EventResult};
use crate::events::Handler;
use crate::executor::Executor;

/// Names of the events fired by an [`Executor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fired once before the batch is scheduled.
    Start,
    /// Fired once after the batch (or its timeout window) closes.
    Finish,
    /// Fired right before a unit starts.
    TaskStart,
    /// Fired right after a unit settles with a value or a captured error.
    TaskFinish,
}

impl EventKind {
    /// Every event in firing order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Start,
        EventKind::TaskStart,
        EventKind::TaskFinish,
        EventKind::Finish,
    ];

    /// Event name as used with [`Executor::on`].
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Finish => "finish",
            EventKind::TaskStart => "task.start",
            EventKind::TaskFinish => "task.finish",
        }
    }
}

impl AsRef<str> for EventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EventError::invalid_handler(s))
    }
}

/// How a unit settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    /// The unit failed and its error was captured.
    Failed { error: String },
}

/// Payload delivered to executor event handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    /// A batch is about to be scheduled
    Started {
        queued: usize,
        /// Concurrency limit, `0` when unbounded.
        limit: usize,
    },
    /// A unit is about to start
    TaskStarted { index: usize },
    /// A unit settled
    TaskFinished {
        index: usize,
        status: TaskStatus,
        duration: Duration,
    },
    /// The batch closed
    Finished {
        completed: usize,
        pending: usize,
        duration: Duration,
    },
}

impl ExecutorEvent {
    /// The event name this payload is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            ExecutorEvent::Started { .. } => EventKind::Start,
            ExecutorEvent::TaskStarted { .. } => EventKind::TaskStart,
            ExecutorEvent::TaskFinished { .. } => EventKind::TaskFinish,
            ExecutorEvent::Finished { .. } => EventKind::Finish,
        }
    }
}

/// Forwards executor events to `tracing`.
///
/// Subscriptions are dropped by the executor's reset after every run, so the
/// reporter has to be attached again before each batch.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    context: Option<String>,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self { context: None }
    }

    /// Label included with every reported event
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Subscribe to every event of `executor`
    pub fn attach<T, E>(&self, executor: &Executor<T, E>) -> EventResult<()>
    where
        T: Send + 'static,
        E: fmt::Debug + Send + 'static,
    {
        for kind in EventKind::ALL {
            let context = self.context.clone().unwrap_or_default();
            executor.on(
                kind,
                Handler::sync(move |event: &ExecutorEvent| {
                    Self::report(&context, event);
                    Ok(())
                }),
            )?;
        }
        Ok(())
    }

    fn format_duration(duration: Duration) -> String {
        if duration.as_secs() > 0 {
            format!("{:.1}s", duration.as_secs_f32())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    fn report(context: &str, event: &ExecutorEvent) {
        match event {
            ExecutorEvent::Started { queued, limit } => {
                tracing::info!(context, queued, limit, "batch started");
            }
            ExecutorEvent::TaskStarted { index } => {
                tracing::debug!(context, index, "task started");
            }
            ExecutorEvent::TaskFinished {
                index,
                status: TaskStatus::Succeeded,
                duration,
            } => {
                tracing::debug!(
                    context,
                    index,
                    duration = %Self::format_duration(*duration),
                    "task succeeded"
                );
            }
            ExecutorEvent::TaskFinished {
                index,
                status: TaskStatus::Failed { error },
                duration,
            } => {
                tracing::warn!(
                    context,
                    index,
                    error,
                    duration = %Self::format_duration(*duration),
                    "task failed"
                );
            }
            ExecutorEvent::Finished {
                completed,
                pending,
                duration,
            } => {
                tracing::info!(
                    context,
                    completed,
                    pending,
                    duration = %Self::format_duration(*duration),
                    "batch finished"
                );
            }
        }
    }
}
