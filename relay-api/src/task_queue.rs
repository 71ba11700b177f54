//! Tokio-backed refresh task queue
//!
//! `enqueue` hands (query id, countdown) pairs to a worker over an
//! unbounded channel; the worker spawns one delayed task per entry and
//! calls back into the engine when the countdown elapses. Queue and
//! worker are created as a pair so the engine can be built with the
//! queue before the worker gets the engine handle.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use relay_core::identity::QueryId;
use relay_engine::{Engine, TaskQueue, TaskQueueError};

#[derive(Clone)]
pub struct TokioTaskQueue {
    tx: mpsc::UnboundedSender<(QueryId, Duration)>,
}

pub struct RefreshWorker {
    rx: mpsc::UnboundedReceiver<(QueryId, Duration)>,
}

impl TokioTaskQueue {
    pub fn new() -> (Self, RefreshWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, RefreshWorker { rx })
    }
}

#[async_trait]
impl TaskQueue for TokioTaskQueue {
    async fn enqueue(&self, query_id: QueryId, countdown: Duration) -> Result<(), TaskQueueError> {
        self.tx
            .send((query_id, countdown))
            .map_err(|_| TaskQueueError::new("refresh worker is not running"))
    }
}

impl RefreshWorker {
    /// Drive refresh tasks until `shutdown` flips. Each queued entry
    /// becomes an independent delayed tokio task, so a slow origin
    /// fetch never delays other queries.
    pub async fn run(mut self, engine: Engine, mut shutdown: watch::Receiver<bool>) {
        info!("refresh worker started");
        loop {
            tokio::select! {
                entry = self.rx.recv() => {
                    let Some((query_id, countdown)) = entry else {
                        break;
                    };
                    debug!(%query_id, countdown_secs = countdown.as_secs(), "refresh task accepted");
                    let engine = engine.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(countdown).await;
                        match engine.run_refresh_task(query_id).await {
                            Ok(published) => {
                                debug!(%query_id, published, "refresh task finished");
                            }
                            Err(e) => {
                                error!(%query_id, error = %e, "refresh task failed");
                            }
                        }
                    });
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("refresh worker stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::identity::new_query_id;

    #[tokio::test]
    async fn test_enqueue_fails_once_worker_is_dropped() {
        let (queue, worker) = TokioTaskQueue::new();
        drop(worker);
        let result = queue.enqueue(new_query_id(), Duration::from_secs(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_enqueue_reaches_the_worker() {
        let (queue, mut worker) = TokioTaskQueue::new();
        let id = new_query_id();
        queue.enqueue(id, Duration::from_secs(30)).await.unwrap();
        let (received, countdown) = worker.rx.recv().await.unwrap();
        assert_eq!(received, id);
        assert_eq!(countdown.as_secs(), 30);
    }
}
