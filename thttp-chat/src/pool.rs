use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Bounded set of workers for long-lived connection jobs.
///
/// At most `size` submitted jobs run at once; the rest wait, in submission
/// order, for a running job to finish. A connection job holds its worker for
/// the whole life of the connection, so `size` bounds concurrently served
/// clients.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not currently running a job.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn submit<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            if let Ok(_worker) = permits.acquire_owned().await {
                job.await;
            }
        })
    }
}
