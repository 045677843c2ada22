//! Single-concurrency scan queue with supersede-on-submit semantics.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// A queue that runs at most one reconciliation scan at a time.
///
/// Submitting new work cancels every previously submitted request,
/// whether it is still waiting for the gate or already running: rapid
/// bursts of notifications coalesce into "run the latest requested
/// scan, discard the rest". Cancellation is cooperative — running work
/// receives its token and is expected to check it at per-file
/// granularity and never deliver a superseded result.
#[derive(Debug)]
pub struct ScanQueue {
    /// Serializes execution; queued tasks wait here.
    gate: Arc<tokio::sync::Mutex<()>>,
    /// Token of the most recently admitted request.
    current: Mutex<Option<CancellationToken>>,
}

impl Default for ScanQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: Arc::new(tokio::sync::Mutex::new(())),
            current: Mutex::new(None),
        }
    }

    /// Cancel all prior requests and admit `work`.
    ///
    /// `work` runs on a background task once the gate is free, unless
    /// it was superseded while waiting. Returns the request's token,
    /// which a later `submit` or [`cancel_all`](Self::cancel_all) will
    /// cancel.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn submit<F, Fut>(&self, work: F) -> CancellationToken
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        {
            let mut current = self.current.lock();
            if let Some(previous) = current.take() {
                previous.cancel();
            }
            *current = Some(token.clone());
        }

        let gate = Arc::clone(&self.gate);
        let task_token = token.clone();
        tokio::spawn(async move {
            let _permit = gate.lock().await;
            if task_token.is_cancelled() {
                tracing::debug!("Scan request superseded before it started");
                return;
            }
            work(task_token).await;
        });

        token
    }

    /// Cancel the current request without admitting a new one.
    pub fn cancel_all(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_single_request_runs() {
        let queue = ScanQueue::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        queue.submit(move |_cancel| async move {
            tx.send("ran").unwrap();
        });

        assert_eq!(rx.recv().await, Some("ran"));
    }

    #[tokio::test]
    async fn test_second_submit_supersedes_first() {
        let queue = ScanQueue::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let tx1 = tx.clone();
        queue.submit(move |cancel| async move {
            // Simulate a long enumeration; honor cancellation after it.
            tokio::time::sleep(Duration::from_millis(100)).await;
            if !cancel.is_cancelled() {
                tx1.send(1).unwrap();
            }
        });

        let tx2 = tx.clone();
        queue.submit(move |cancel| async move {
            if !cancel.is_cancelled() {
                tx2.send(2).unwrap();
            }
        });
        drop(tx);

        let mut delivered = Vec::new();
        while let Some(value) = rx.recv().await {
            delivered.push(value);
        }
        assert_eq!(delivered, vec![2]);
    }

    #[tokio::test]
    async fn test_requests_never_overlap() {
        let queue = ScanQueue::new();
        let running = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for _ in 0..4 {
            let running = Arc::clone(&running);
            let tx = tx.clone();
            queue.submit(move |_cancel| async move {
                let was_running = running.swap(true, std::sync::atomic::Ordering::SeqCst);
                tx.send(was_running).unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
        drop(tx);

        while let Some(was_running) = rx.recv().await {
            assert!(!was_running, "two scan requests ran concurrently");
        }
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let queue = ScanQueue::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        queue.submit(move |cancel| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if !cancel.is_cancelled() {
                tx.send(()).unwrap();
            }
        });
        queue.cancel_all();

        assert_eq!(rx.recv().await, None);
    }
}
