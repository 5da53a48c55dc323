//! Fixed-size worker pool fed from a bounded channel.
//!
//! One feeder task pushes root entities in order and closes the channel.
//! Each worker pulls entities one at a time and keeps its own batch of
//! results; batches are merged after every worker has returned. The first
//! fatal error cancels the phase: the feeder stops sending, workers stop
//! taking new entities, and in-flight fetches see the cancelled token.

use crate::utils::error::{ExportError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    workers: usize,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// `cancel` is the run token; each phase works on a child of it.
    pub fn new(workers: usize, cancel: CancellationToken) -> Self {
        Self {
            workers: workers.max(1),
            cancel,
        }
    }

    /// Runs `work` over every item with at most `workers` items in flight.
    ///
    /// Result order is unspecified. On failure no partial results are returned.
    pub async fn run<I, R, F, Fut>(&self, phase: &str, items: Vec<I>, work: F) -> Result<Vec<R>>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(I, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let total = items.len();
        let phase_cancel = self.cancel.child_token();
        let (tx, rx) = mpsc::channel::<I>(self.workers);
        let rx = Arc::new(Mutex::new(rx));
        let work = Arc::new(work);

        tracing::info!("🚚 {}: dispatching {} items to {} workers", phase, total, self.workers);

        let feeder = {
            let cancel = phase_cancel.clone();
            tokio::spawn(async move {
                for item in items {
                    tokio::select! {
                        sent = tx.send(item) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                        _ = cancel.cancelled() => break,
                    }
                }
                // tx dropped here, closing the channel
            })
        };

        let mut pool = JoinSet::new();
        for worker_id in 0..self.workers {
            let rx = rx.clone();
            let work = work.clone();
            let cancel = phase_cancel.clone();
            let phase = phase.to_string();
            pool.spawn(async move {
                let mut batch = Vec::new();
                loop {
                    let next = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            item = rx.recv() => item,
                            _ = cancel.cancelled() => None,
                        }
                    };
                    let Some(item) = next else {
                        break;
                    };
                    if cancel.is_cancelled() {
                        break;
                    }

                    match work(item, cancel.clone()).await {
                        Ok(result) => batch.push(result),
                        Err(e) => {
                            if !e.is_cancelled() {
                                tracing::error!("❌ {} worker {} failed: {}", phase, worker_id, e);
                            }
                            cancel.cancel();
                            return Err(e);
                        }
                    }
                }
                tracing::debug!("{} worker {} done after {} items", phase, worker_id, batch.len());
                Ok(batch)
            });
        }

        let mut results = Vec::with_capacity(total);
        let mut failure: Option<ExportError> = None;
        while let Some(joined) = pool.join_next().await {
            let outcome = joined.map_err(|e| ExportError::WorkerError {
                message: e.to_string(),
            });
            match outcome.and_then(|batch| batch) {
                Ok(batch) => results.extend(batch),
                Err(e) => {
                    phase_cancel.cancel();
                    failure = match failure {
                        // keep the root cause, not the cancellations it triggered
                        Some(existing) if !existing.is_cancelled() => Some(existing),
                        _ => Some(e),
                    };
                }
            }
        }

        if let Err(e) = feeder.await {
            failure.get_or_insert(ExportError::WorkerError {
                message: e.to_string(),
            });
        }

        if let Some(e) = failure {
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        tracing::info!("✅ {}: {} of {} items done", phase, results.len(), total);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_all_items_processed() {
        let dispatcher = Dispatcher::new(DEFAULT_WORKERS, CancellationToken::new());
        let items: Vec<u32> = (1..=25).collect();

        let mut results = dispatcher
            .run("test", items, |n, _cancel| async move {
                tokio::time::sleep(Duration::from_millis(10 * (n as u64 % 3))).await;
                Ok(n * 2)
            })
            .await
            .unwrap();

        results.sort_unstable();
        assert_eq!(results, (1..=25).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dispatcher = Dispatcher::new(DEFAULT_WORKERS, CancellationToken::new());
        let results: Vec<u32> = dispatcher
            .run("empty", Vec::<u32>::new(), |n, _| async move { Ok(n) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_dispatch() {
        let dispatcher = Dispatcher::new(10, CancellationToken::new());
        let started = Arc::new(StdMutex::new(HashSet::new()));
        let finished = Arc::new(StdMutex::new(HashSet::new()));

        let result = {
            let started = started.clone();
            let finished = finished.clone();
            dispatcher
                .run("tokens", (1..=25u32).collect(), move |n, cancel| {
                    let started = started.clone();
                    let finished = finished.clone();
                    async move {
                        started.lock().unwrap().insert(n);
                        if n == 13 {
                            return Err(ExportError::HttpStatus {
                                status: 500,
                                path: format!("/token/{}/owners", n),
                            });
                        }
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                            _ = cancel.cancelled() => return Err(ExportError::Cancelled),
                        }
                        finished.lock().unwrap().insert(n);
                        Ok(n)
                    }
                })
                .await
        };

        match result {
            Err(ExportError::HttpStatus { status, path }) => {
                assert_eq!(status, 500);
                assert_eq!(path, "/token/13/owners");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let started = started.lock().unwrap();
        let finished = finished.lock().unwrap();
        assert!(!finished.contains(&13));
        // nothing after the failing item is ever picked up
        assert!(started.contains(&13));
        assert!(started.iter().all(|n| *n <= 13));
    }

    #[tokio::test]
    async fn test_run_cancelled_from_outside() {
        let run_cancel = CancellationToken::new();
        run_cancel.cancel();
        let dispatcher = Dispatcher::new(4, run_cancel);

        let result = dispatcher
            .run("communities", vec![1u32, 2, 3], |n, _| async move { Ok(n) })
            .await;

        assert!(matches!(result, Err(ExportError::Cancelled)));
    }
}
