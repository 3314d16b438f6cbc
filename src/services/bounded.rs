use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::services::error::DomainError;

/// Runs `count` tasks with at most `limit` executing concurrently.
///
/// Result slot `i` always holds the value produced by task `i`, regardless of
/// completion order. The first reported error wins: the semaphore is closed so
/// queued tasks never start, in-flight tasks finish their current unit of
/// work, and sibling errors discovered afterwards are dropped. Side effects a
/// task performed before the error surfaced are not rolled back.
pub(crate) async fn run_bounded<T, F, Fut>(
    limit: usize,
    count: usize,
    task: F,
) -> Result<Vec<T>, DomainError>
where
    T: Send + 'static,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T, DomainError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let first_error: Arc<Mutex<Option<DomainError>>> = Arc::new(Mutex::new(None));
    let mut join_set = JoinSet::new();

    for index in 0..count {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            // Closed by a failed sibling; nothing after this index starts.
            Err(_) => break,
        };

        let fut = task(index);
        let semaphore = Arc::clone(&semaphore);
        let first_error = Arc::clone(&first_error);

        join_set.spawn(async move {
            let result = fut.await;
            drop(permit);

            match result {
                Ok(value) => Some((index, value)),
                Err(err) => {
                    record_error(&first_error, index, err);
                    semaphore.close();
                    None
                }
            }
        });
    }

    let mut slots: Vec<Option<T>> = Vec::with_capacity(count);
    slots.resize_with(count, || None);

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Some((index, value))) => slots[index] = Some(value),
            Ok(None) => {}
            Err(err) => {
                let panic_error =
                    DomainError::Unavailable(format!("evaluation task aborted: {err}"));
                record_error(&first_error, usize::MAX, panic_error);
                semaphore.close();
            }
        }
    }

    if let Some(err) = lock_error(&first_error).take() {
        return Err(err);
    }

    let mut results = Vec::with_capacity(count);
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(value) => results.push(value),
            None => {
                return Err(DomainError::Unavailable(format!(
                    "evaluation task {index} produced no result"
                )))
            }
        }
    }

    Ok(results)
}

fn record_error(slot: &Mutex<Option<DomainError>>, index: usize, err: DomainError) {
    let mut guard = lock_error(slot);
    if guard.is_none() {
        *guard = Some(err);
    } else {
        tracing::debug!(index, error = %err, "Discarding sibling task error");
    }
}

fn lock_error(
    slot: &Mutex<Option<DomainError>>,
) -> std::sync::MutexGuard<'_, Option<DomainError>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn results_keep_input_order_despite_completion_order() {
        let results = run_bounded(4, 8, |index| async move {
            // Later tasks finish first.
            tokio::time::sleep(Duration::from_millis((8 - index as u64) * 5)).await;
            Ok(index * 10)
        })
        .await
        .expect("all tasks succeed");

        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_bounded(3, 20, |index| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            async move {
                let current = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(index)
            }
        })
        .await
        .expect("all tasks succeed");

        assert_eq!(results.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3, "peak was {}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn first_error_wins_and_queued_tasks_never_start() {
        let started = Arc::new(AtomicUsize::new(0));

        let result: Result<Vec<usize>, DomainError> = run_bounded(1, 50, |index| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if index == 2 {
                    return Err(DomainError::Conflict("student 2 incomplete".to_string()));
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(index)
            }
        })
        .await;

        let err = result.expect_err("batch fails");
        assert!(matches!(err, DomainError::Conflict(message) if message.contains("student 2")));

        // With limit 1 only the failing task plus at most one already-queued
        // follower can have started out of the 50.
        assert!(started.load(Ordering::SeqCst) <= 4, "started {}", started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn in_flight_tasks_finish_after_cancellation() {
        let finished = Arc::new(AtomicUsize::new(0));

        let result: Result<Vec<()>, DomainError> = run_bounded(2, 2, |index| {
            let finished = Arc::clone(&finished);
            async move {
                if index == 0 {
                    return Err(DomainError::Unavailable("boom".to_string()));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_tasks_yield_empty_results() {
        let results = run_bounded(5, 0, |index| async move { Ok(index) })
            .await
            .expect("empty batch succeeds");
        assert!(results.is_empty());
    }
}
