use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{JoinError, JoinHandle};

/// Spawns tasks onto the runtime while keeping at most `limit` of them
/// running. A permit is taken before each task starts and held until it ends.
pub struct LimitedSpawner<T> {
    semaphore: Arc<Semaphore>,
    handles: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> LimitedSpawner<T> {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.get())),
            handles: Vec::new(),
        }
    }

    /// Waits for a free slot, then spawns `f`.
    pub async fn spawn<F>(&mut self, f: F) -> Result<(), AcquireError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        self.handles.push(tokio::spawn(async move {
            let _permit = permit;
            f.await
        }));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every spawned task. Results come back in spawn order.
    pub async fn join_all(self) -> Vec<Result<T, JoinError>> {
        futures::future::join_all(self.handles).await
    }
}
