//! Common types and configuration for the flowgate executor

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::{ConfigError, ConfigResult};
use crate::limits::Limit;
use crate::task::TaskResult;

/// Configuration for an [`Executor`](crate::Executor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of units that can run concurrently
    pub limit: Limit,

    /// Return an empty output instead of failing when a run finds no units
    pub ignore_empty: bool,

    /// Default batch timeout (None for no timeout)
    pub timeout: Option<Duration>,

    /// Whether unit failures are captured as results by default
    pub return_exceptions: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            limit: Limit::Default,
            ignore_empty: false,
            timeout: None,
            return_exceptions: false,
        }
    }
}

impl ExecutorConfig {
    /// Create a new executor configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit, `0` meaning unbounded
    pub fn with_limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Enable or disable ignoring empty runs
    pub fn with_ignore_empty(mut self, ignore_empty: bool) -> Self {
        self.ignore_empty = ignore_empty;
        self
    }

    /// Set the default batch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> ConfigResult<Self> {
        if timeout.is_zero() {
            return Err(ConfigError::invalid_timeout(timeout));
        }
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Enable or disable capturing unit failures by default
    pub fn with_return_exceptions(mut self, return_exceptions: bool) -> Self {
        self.return_exceptions = return_exceptions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::invalid_timeout(timeout));
            }
        }
        Ok(())
    }

    /// Configuration running one unit at a time in submission order
    pub fn sequential() -> Self {
        Self {
            limit: Limit::SEQUENTIAL,
            ..Self::default()
        }
    }

    /// Configuration admitting every unit at once
    pub fn unbounded() -> Self {
        Self {
            limit: Limit::None,
            ..Self::default()
        }
    }
}

/// When a concurrent run returns.
///
/// Only honoured by the concurrent strategy; a sequential run always waits
/// for every unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnWhen {
    /// Wait until every unit settled
    #[default]
    AllCompleted,
    /// Return as soon as one unit settled
    FirstCompleted,
    /// Return as soon as one unit failed with a captured error
    FirstException,
}

/// Per-run options. Unset values fall back to the executor configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub return_exceptions: Option<bool>,
    pub return_when: ReturnWhen,
    pub ignore_empty: Option<bool>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_return_exceptions(mut self, return_exceptions: bool) -> Self {
        self.return_exceptions = Some(return_exceptions);
        self
    }

    pub fn with_return_when(mut self, return_when: ReturnWhen) -> Self {
        self.return_when = return_when;
        self
    }

    pub fn with_ignore_empty(mut self, ignore_empty: bool) -> Self {
        self.ignore_empty = Some(ignore_empty);
        self
    }
}

/// Run options merged with the executor defaults.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunPolicy {
    pub timeout: Option<Duration>,
    pub capture: bool,
    pub return_when: ReturnWhen,
    pub ignore_empty: bool,
}

impl RunPolicy {
    pub fn resolve(config: &ExecutorConfig, options: &RunOptions) -> Self {
        Self {
            timeout: options.timeout.or(config.timeout),
            capture: options.return_exceptions.unwrap_or(config.return_exceptions),
            return_when: options.return_when,
            ignore_empty: options.ignore_empty.unwrap_or(config.ignore_empty),
        }
    }
}

/// A unit that settled before the run returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask<T, E> {
    pub index: usize,
    pub result: TaskResult<T, E>,
}

/// A unit that had not settled when the run returned.
///
/// The unit keeps running in the background; await [`PendingTask::join`] to
/// collect it or [`PendingTask::abort`] to drop it.
#[derive(Debug)]
pub struct PendingTask<T, E> {
    index: usize,
    handle: JoinHandle<TaskResult<T, E>>,
}

impl<T, E> PendingTask<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn spawn(index: usize, future: BoxFuture<'static, TaskResult<T, E>>) -> Self {
        Self {
            index,
            handle: tokio::spawn(future),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the unit. Its result will be [`TaskResult::Cancelled`].
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the unit to settle
    pub async fn join(self) -> TaskResult<T, E> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => TaskResult::Cancelled,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

/// The `(completed, pending)` partition returned by a run.
#[derive(Debug)]
pub struct RunOutput<T, E> {
    pub completed: Vec<CompletedTask<T, E>>,
    pub pending: Vec<PendingTask<T, E>>,
}

impl<T, E> Default for RunOutput<T, E> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl<T, E> RunOutput<T, E> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of units accounted for by this output.
    pub fn len(&self) -> usize {
        self.completed.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every unit settled before the run returned.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Results written into slots by original submission index.
    ///
    /// Slots of pending units are `None`.
    pub fn ordered_results(&self) -> Vec<Option<TaskResult<T, E>>>
    where
        T: Clone,
        E: Clone,
    {
        let mut slots: Vec<Option<TaskResult<T, E>>> = vec![None; self.slot_count()];
        for task in &self.completed {
            slots[task.index] = Some(task.result.clone());
        }
        slots
    }

    /// Consume the output, writing results into slots by submission index.
    ///
    /// Pending units are dropped from the output (they keep running detached);
    /// their slots are `None`.
    pub fn into_ordered(self) -> Vec<Option<TaskResult<T, E>>> {
        let mut slots: Vec<Option<TaskResult<T, E>>> = Vec::new();
        slots.resize_with(self.slot_count(), || None);
        for task in self.completed {
            slots[task.index] = Some(task.result);
        }
        slots
    }

    /// Success values in submission order.
    ///
    /// Failed, cancelled and pending units are skipped.
    pub fn into_values(self) -> Vec<T> {
        self.into_ordered()
            .into_iter()
            .flatten()
            .filter_map(TaskResult::success)
            .collect()
    }

    fn slot_count(&self) -> usize {
        self.completed
            .iter()
            .map(|task| task.index)
            .chain(self.pending.iter().map(|task| task.index))
            .max()
            .map_or(0, |max| max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limit.resolve(), Some(10));
        assert!(!config.ignore_empty);
        assert!(!config.return_exceptions);
    }

    #[test]
    fn test_config_builder() {
        let config = ExecutorConfig::new()
            .with_limit(4)
            .with_ignore_empty(true)
            .with_return_exceptions(true)
            .with_timeout(Duration::from_secs(2))
            .unwrap();

        assert_eq!(config.limit.resolve(), Some(4));
        assert!(config.ignore_empty);
        assert!(config.return_exceptions);
        assert_eq!(config.timeout, Some(Duration::from_secs(2)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let result = ExecutorConfig::new().with_timeout(Duration::from_secs(0));
        assert!(result.is_err());

        let config = ExecutorConfig {
            timeout: Some(Duration::ZERO),
            ..ExecutorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preset_configs() {
        assert!(ExecutorConfig::sequential().limit.is_sequential());
        assert_eq!(ExecutorConfig::unbounded().limit.resolve(), None);
    }

    #[test]
    fn test_config_serde() {
        let config: ExecutorConfig =
            serde_json::from_str(r#"{ "limit": { "Max": 3 }, "ignore_empty": true }"#).unwrap();
        assert_eq!(config.limit, Limit::from(3));
        assert!(config.ignore_empty);
        assert_eq!(config.timeout, None);

        let json = serde_json::to_string(&ExecutorConfig::unbounded()).unwrap();
        let back: ExecutorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ExecutorConfig::unbounded());
    }

    #[test]
    fn test_run_policy_overrides_defaults() {
        let config = ExecutorConfig::new()
            .with_ignore_empty(true)
            .with_timeout(Duration::from_secs(1))
            .unwrap();

        let inherited = RunPolicy::resolve(&config, &RunOptions::new());
        assert!(inherited.ignore_empty);
        assert!(!inherited.capture);
        assert_eq!(inherited.timeout, Some(Duration::from_secs(1)));

        let overridden = RunPolicy::resolve(
            &config,
            &RunOptions::new()
                .with_ignore_empty(false)
                .with_return_exceptions(true)
                .with_timeout(Duration::from_millis(10)),
        );
        assert!(!overridden.ignore_empty);
        assert!(overridden.capture);
        assert_eq!(overridden.timeout, Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_ordered_results() {
        let output: RunOutput<u32, String> = RunOutput {
            completed: vec![
                CompletedTask {
                    index: 2,
                    result: TaskResult::Success(30),
                },
                CompletedTask {
                    index: 0,
                    result: TaskResult::Success(10),
                },
                CompletedTask {
                    index: 1,
                    result: TaskResult::Error("bad".to_string()),
                },
            ],
            pending: Vec::new(),
        };

        assert!(output.is_complete());
        assert_eq!(output.len(), 3);
        assert_eq!(
            output.into_ordered(),
            vec![
                Some(TaskResult::Success(10)),
                Some(TaskResult::Error("bad".to_string())),
                Some(TaskResult::Success(30)),
            ]
        );
        assert!(RunOutput::<u32, String>::empty().into_ordered().is_empty());
    }

    #[test]
    fn test_into_values_skips_failures() {
        let output: RunOutput<u32, String> = RunOutput {
            completed: vec![
                CompletedTask {
                    index: 1,
                    result: TaskResult::Cancelled,
                },
                CompletedTask {
                    index: 2,
                    result: TaskResult::Success(3),
                },
                CompletedTask {
                    index: 0,
                    result: TaskResult::Success(1),
                },
            ],
            pending: Vec::new(),
        };
        assert_eq!(output.into_values(), vec![1, 3]);
    }
}
