//! Bounded parallel execution of blocking work.
//!
//! [`map_bounded`] runs a fallible closure over a batch of items on the
//! blocking thread pool, at most `workers` at a time, and reports one
//! outcome per item in input order. A failing or panicking item never takes
//! the batch down with it; the failure becomes that item's result.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Worker count for CPU-plus-IO bound batches: leaves headroom beyond the
/// core count but caps the thread fan-out on large machines.
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

fn panic_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Applies `f` to every item with at most `workers` running concurrently.
///
/// The returned vector is parallel to `items`: outcome `i` belongs to item
/// `i` regardless of completion order. Panics inside `f` are caught and
/// reported as that item's error string.
pub async fn map_bounded<T, R, F>(items: Vec<T>, workers: usize, f: F) -> Vec<Result<R, String>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, String> + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let f = Arc::new(f);

    let tasks: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = Arc::clone(&semaphore);
            let f = Arc::clone(&f);
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err("worker pool closed".to_string()),
                };
                match tokio::task::spawn_blocking(move || f(item)).await {
                    Ok(outcome) => outcome,
                    Err(join_err) => Err(panic_reason(join_err)),
                }
            }
        })
        .collect();

    join_all(tasks).await
}
