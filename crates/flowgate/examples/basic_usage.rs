//! Basic usage example for the flowgate executor
//!
//! This example queues a handful of units, runs them two at a time and
//! prints the results in submission order.

use std::time::Duration;

use flowgate::{Executor, RunOptions, TaskResult};
use thiserror::Error;

#[derive(Debug, Error)]
enum MathError {
    #[error("{a} * {b} overflows")]
    Overflow { a: i32, b: i32 },
}

#[derive(Clone, Copy, Debug)]
enum MathTask {
    Add { a: i32, b: i32 },
    Multiply { a: i32, b: i32 },
}

impl MathTask {
    async fn execute(self) -> Result<i32, MathError> {
        match self {
            MathTask::Add { a, b } => {
                // Simulate some work
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(a + b)
            }
            MathTask::Multiply { a, b } => {
                tokio::time::sleep(Duration::from_millis(150)).await;
                a.checked_mul(b).ok_or(MathError::Overflow { a, b })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Basic flowgate usage ===\n");

    let executor: Executor<i32, MathError> = Executor::new(2);
    let tasks = [
        MathTask::Add { a: 10, b: 20 },
        MathTask::Multiply { a: 3, b: 7 },
        MathTask::Add { a: 5, b: 15 },
        MathTask::Multiply { a: i32::MAX, b: 2 },
    ];

    for task in tasks {
        let index = executor.add_fn(move || task.execute())?;
        println!("  queued #{index}: {task:?}");
    }

    println!("\nRunning {} units with limit {:?}...", executor.len(), executor.limit());
    let start = std::time::Instant::now();

    // Capture failures so one overflow does not abort the batch
    let output = executor
        .run(RunOptions::new().with_return_exceptions(true))
        .await?;

    println!("Finished in {:?}\n", start.elapsed());
    for (index, slot) in output.into_ordered().into_iter().enumerate() {
        match slot {
            Some(TaskResult::Success(value)) => println!("  #{index}: {value}"),
            Some(TaskResult::Error(err)) => println!("  #{index}: failed ({err})"),
            Some(TaskResult::Cancelled) | None => println!("  #{index}: did not run"),
        }
    }

    Ok(())
}
