//! Flowgate - Bounded Async Task Executor
//!
//! A small task execution engine built on top of `tokio` for running batches
//! of asynchronous units of work under a concurrency ceiling.
//!
//! # Overview
//!
//! Flowgate provides a queue-then-run executor where:
//! - Each unit is an asynchronous function, or a future already created
//! - A semaphore gate keeps at most `limit` units in flight (`1` runs them in order)
//! - Lifecycle events (`start`, `task.start`, `task.finish`, `finish`) can be observed
//! - Unit failures are either captured as results or abort the batch
//! - A batch timeout splits the units into completed and still pending ones
//!
//! # Example
//!
//! ```rust
//! use flowgate::{Executor, Handler, RunOptions, TaskResult};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor: Executor<i32, std::fmt::Error> = Executor::new(2);
//!
//!     executor.on(
//!         "task.finish",
//!         Handler::sync(|event: &flowgate::ExecutorEvent| {
//!             println!("{event:?}");
//!             Ok(())
//!         }),
//!     )?;
//!
//!     for (a, b) in [(1, 2), (3, 4), (5, 6)] {
//!         executor.add_fn(move || async move { Ok(a + b) })?;
//!     }
//!
//!     let output = executor.run(RunOptions::new()).await?;
//!     assert_eq!(
//!         output.into_ordered(),
//!         vec![
//!             Some(TaskResult::Success(3)),
//!             Some(TaskResult::Success(7)),
//!             Some(TaskResult::Success(11)),
//!         ]
//!     );
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod executor;
pub mod invoke;
pub mod limits;
pub mod reporter;
pub mod task;
pub mod types;

pub use error::{
    ConfigError, EventError, ExecutorError, ExecutorResult, HandlerError, RunError,
};
pub use events::{EventDispatcher, Handler, HandlerFuture};
pub use executor::Executor;
pub use invoke::safe_invoke;
pub use limits::{Limit, DEFAULT_LIMIT};
pub use reporter::{EventKind, ExecutorEvent, TaskStatus, TracingReporter};
pub use task::{TaskError, TaskRecord, TaskResult, Unit, UnitFuture};
pub use types::{CompletedTask, ExecutorConfig, PendingTask, ReturnWhen, RunOptions, RunOutput};
