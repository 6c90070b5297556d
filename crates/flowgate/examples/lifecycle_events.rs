//! Lifecycle events, cancellation and batch timeouts
//!
//! Attaches the tracing reporter plus a custom async handler, cancels a batch
//! from inside one of its units and finally runs a batch that outlives its
//! timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowgate::{Executor, ExecutorConfig, ExecutorEvent, Handler, RunOptions, TracingReporter};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("sleeper {millis}ms failed")]
struct SleeperError {
    millis: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("flowgate=debug,lifecycle_events=info")
        .init();

    let executor: Executor<u64, SleeperError> = Executor::with_config(
        ExecutorConfig::new()
            .with_limit(3)
            .with_return_exceptions(true),
    )?;

    // Events
    let finished = Arc::new(AtomicUsize::new(0));
    TracingReporter::new()
        .with_context("events")
        .attach(&executor)?;
    {
        let finished = Arc::clone(&finished);
        executor.on(
            "task.finish",
            Handler::future(move |event: ExecutorEvent| {
                let finished = Arc::clone(&finished);
                async move {
                    if let ExecutorEvent::TaskFinished { index, .. } = event {
                        finished.fetch_add(1, Ordering::SeqCst);
                        tracing::info!(index, "unit settled");
                    }
                    Ok(())
                }
            }),
        )?;
    }
    for millis in [30, 10, 20, 40] {
        executor.add_fn(move || async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            if millis == 40 {
                return Err(SleeperError { millis });
            }
            Ok(millis)
        })?;
    }
    let output = executor.run(RunOptions::new()).await?;
    println!(
        "events: {} completed, {} task.finish events",
        output.completed.len(),
        finished.load(Ordering::SeqCst)
    );
    for task in output.completed.iter().filter(|task| task.result.is_error()) {
        println!("  #{} captured an error", task.index);
    }

    // Cancellation from inside the batch
    for step in 0..6u64 {
        let handle = executor.clone();
        executor.add_fn(move || async move {
            tokio::time::sleep(Duration::from_millis(10 * (step + 1))).await;
            if step == 0 {
                handle.cancel();
            }
            Ok(step)
        })?;
    }
    let output = executor.run(RunOptions::new()).await?;
    let cancelled = output
        .completed
        .iter()
        .filter(|task| task.result.is_cancelled())
        .count();
    println!("cancel: {cancelled} of {} units never started", output.len());

    // Timeout
    for millis in [10, 500, 20] {
        executor.add_fn(move || async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(millis)
        })?;
    }
    let output = executor
        .run(RunOptions::new().with_timeout(Duration::from_millis(100)))
        .await?;
    println!(
        "timeout: {} completed, {} still running",
        output.completed.len(),
        output.pending.len()
    );
    for task in output.pending {
        println!("  #{} settled later with {:?}", task.index(), task.join().await);
    }

    Ok(())
}
