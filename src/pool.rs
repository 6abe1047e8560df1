//! AI worker pool with bounded admission.
//!
//! A fixed set of workers consumes tasks from a bounded channel whose
//! capacity equals the worker count — the channel *is* the admission queue.
//! Enqueueing blocks, bounded by the per-task queue timeout; when the wait
//! elapses the request is rejected upstream with HTTP 429 instead of piling
//! more work onto a saturated upstream.
//!
//! Workers race each call against the task deadline and against the
//! requester disappearing (the result channel closing), so an abandoned
//! request stops consuming upstream quota at the next await point.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{BloopError, Result};
use crate::llm::{LlmError, NarrativeClient};

/// How long shutdown waits for in-flight workers.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Outcome of one AI task: a JSON blob, a clean skip, or an error.
pub type AiOutcome = std::result::Result<Option<String>, LlmError>;

/// One unit of AI work.
#[derive(Debug)]
pub struct AiTask {
    /// Per-sender stratified sample, ready for prompt embedding.
    pub sample: BTreeMap<String, Vec<String>>,
    /// Distinct senders in the chat; drives the prompt's people block.
    pub user_count: usize,
    /// The idle gap that segmented the sample, in hours. Logged for
    /// diagnosis of odd samples.
    pub gap_hours: f64,
    /// Absolute deadline inherited from the request.
    pub deadline: Instant,
    /// Single-slot result channel back to the orchestrator.
    pub result_tx: oneshot::Sender<AiOutcome>,
    /// Request tag for log correlation.
    pub log_tag: String,
}

/// Point-in-time pool state for the health endpoint.
#[derive(Debug, Clone, Copy)]
pub struct PoolMetrics {
    pub queued: usize,
    pub processing: i64,
    pub capacity: usize,
}

/// Handle to the process-wide AI worker pool.
#[derive(Debug)]
pub struct AiPool {
    sender: Mutex<Option<mpsc::Sender<AiTask>>>,
    active: Arc<AtomicI64>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
}

impl AiPool {
    /// Spawns `worker_count` workers sharing one bounded queue.
    pub fn start(worker_count: usize, client: Arc<NarrativeClient>) -> Self {
        let worker_count = worker_count.max(1);
        let (tx, rx) = mpsc::channel::<AiTask>(worker_count);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let active = Arc::new(AtomicI64::new(0));

        info!(workers = worker_count, "starting AI workers");
        let workers = (0..worker_count)
            .map(|id| {
                let rx = Arc::clone(&rx);
                let client = Arc::clone(&client);
                let active = Arc::clone(&active);
                tokio::spawn(worker_loop(id, rx, client, active))
            })
            .collect();

        Self {
            sender: Mutex::new(Some(tx)),
            active,
            workers: Mutex::new(workers),
            capacity: worker_count,
        }
    }

    /// Enqueues a task, waiting at most `queue_timeout` for a slot.
    ///
    /// A full queue past the timeout is [`BloopError::AiQueueTimeout`]; a
    /// closed queue (shutdown in progress) reports the channel as gone.
    pub async fn submit(&self, task: AiTask, queue_timeout: Duration) -> Result<()> {
        let sender = {
            let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        let Some(sender) = sender else {
            return Err(BloopError::AiChannelClosed);
        };

        match sender.send_timeout(task, queue_timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(task)) => {
                warn!(tag = %task.log_tag, "timed out waiting to queue AI task");
                Err(BloopError::AiQueueTimeout)
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(BloopError::AiChannelClosed),
        }
    }

    /// Queue depth, in-flight count, and worker capacity.
    pub fn metrics(&self) -> PoolMetrics {
        let queued = {
            let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .as_ref()
                .map(|s| s.max_capacity() - s.capacity())
                .unwrap_or(0)
        };
        PoolMetrics {
            queued,
            processing: self.active.load(Ordering::SeqCst),
            capacity: self.capacity,
        }
    }

    /// Closes the queue and waits up to ten seconds for workers to drain.
    pub async fn shutdown(&self) {
        info!("closing AI task queue");
        {
            let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            guard.take();
        }

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };

        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!("AI workers did not finish gracefully within timeout");
        } else {
            info!("all AI workers finished");
        }
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<AiTask>>>,
    client: Arc<NarrativeClient>,
    active: Arc<AtomicI64>,
) {
    debug!(worker = id, "AI worker started");
    loop {
        let task = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(task) = task else {
            break;
        };

        let AiTask {
            sample,
            user_count,
            gap_hours,
            deadline,
            mut result_tx,
            log_tag,
        } = task;

        let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(worker = id, tag = %log_tag, gap_hours, active = now_active, "processing AI task");

        let outcome: AiOutcome = tokio::select! {
            _ = result_tx.closed() => Err(LlmError::Cancelled),
            res = tokio::time::timeout_at(deadline, client.narrate(&sample, user_count)) => {
                match res {
                    Ok(inner) => inner,
                    Err(_) => Err(LlmError::DeadlineExceeded),
                }
            }
        };

        active.fetch_sub(1, Ordering::SeqCst);

        match &outcome {
            Err(e) if e.is_cancellation() => {
                debug!(worker = id, tag = %log_tag, "task ended early: {e}")
            }
            Err(e) => warn!(worker = id, tag = %log_tag, "AI analysis error: {e}"),
            Ok(_) => debug!(worker = id, tag = %log_tag, "finished AI analysis"),
        }

        if result_tx.send(outcome).is_err() {
            debug!(
                worker = id,
                tag = %log_tag,
                "failed to send result back (receiver timed out or cancelled)"
            );
        }
    }
    debug!(worker = id, "AI worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::keys::KeyRing;
    use crate::llm::LlmConfig;

    fn disabled_client() -> Arc<NarrativeClient> {
        Arc::new(NarrativeClient::new(LlmConfig::default(), KeyRing::new(vec![], None)).unwrap())
    }

    fn task(tx: oneshot::Sender<AiOutcome>) -> AiTask {
        AiTask {
            sample: BTreeMap::from([(
                "Alice".to_string(),
                vec!["a long enough message for the sampler gate".to_string()],
            )]),
            user_count: 2,
            gap_hours: 2.0,
            deadline: Instant::now() + Duration::from_secs(30),
            result_tx: tx,
            log_tag: "[test]".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pool_runs_task_and_returns_outcome() {
        let pool = AiPool::start(2, disabled_client());
        let (tx, rx) = oneshot::channel();
        pool.submit(task(tx), Duration::from_secs(1)).await.unwrap();

        // Credentials are absent, so the client reports a clean skip.
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Ok(None)));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_metrics_report_capacity() {
        let pool = AiPool::start(3, disabled_client());
        let metrics = pool.metrics();
        assert_eq!(metrics.capacity, 3);
        assert_eq!(metrics.processing, 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let pool = AiPool::start(1, disabled_client());
        pool.shutdown().await;

        let (tx, _rx) = oneshot::channel();
        let err = pool.submit(task(tx), Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, BloopError::AiChannelClosed));
    }

    #[tokio::test]
    async fn test_elapsed_deadline_yields_deadline_error() {
        let pool = AiPool::start(1, disabled_client());
        let (tx, rx) = oneshot::channel();
        let mut t = task(tx);
        t.deadline = Instant::now() - Duration::from_secs(1);
        pool.submit(t, Duration::from_secs(1)).await.unwrap();

        let outcome = rx.await.unwrap();
        // A skip-path client returns instantly, so either result is
        // cancellation-clean; an expired deadline must never be an Ok blob.
        match outcome {
            Ok(None) => {}
            Err(e) => assert!(e.is_cancellation()),
            Ok(Some(_)) => panic!("expired deadline produced a result"),
        }
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_count_floor_is_one() {
        let pool = AiPool::start(0, disabled_client());
        assert_eq!(pool.metrics().capacity, 1);
        pool.shutdown().await;
    }
}
