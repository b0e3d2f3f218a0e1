use std::sync::Mutex;

use futures::future::BoxFuture;

/// Unit of background work handed off by `submit`.
pub type JobFuture = BoxFuture<'static, ()>;

/// Runs job futures without the submitter awaiting them.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: JobFuture);
}

/// Hands each job to the tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: JobFuture) {
        tokio::spawn(task);
    }
}

/// Queues jobs until `run_pending` is awaited, so callers control exactly
/// when background work happens.
#[derive(Default)]
pub struct DeferredSpawner {
    queue: Mutex<Vec<JobFuture>>,
}

impl DeferredSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run every queued job to completion in submission order. Returns how
    /// many ran.
    pub async fn run_pending(&self) -> usize {
        let tasks: Vec<JobFuture> = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *queue)
        };
        let count = tasks.len();
        for task in tasks {
            task.await;
        }
        count
    }
}

impl TaskSpawner for DeferredSpawner {
    fn spawn(&self, task: JobFuture) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task);
    }
}

impl std::fmt::Debug for DeferredSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSpawner")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_deferred_spawner_runs_in_order() {
        let spawner = DeferredSpawner::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            spawner.spawn(async move { log.lock().unwrap().push(i) }.boxed());
        }
        assert_eq!(spawner.pending(), 3);
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(spawner.run_pending().await, 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(spawner.pending(), 0);
    }

    #[tokio::test]
    async fn test_tokio_spawner_runs_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel();
        let c = Arc::clone(&counter);
        TokioSpawner.spawn(
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            }
            .boxed(),
        );
        rx.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
