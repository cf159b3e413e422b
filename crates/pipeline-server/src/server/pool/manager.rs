//! Fixed-size pool of competing workers.
//!
//! [`WorkerPool`] spawns `size` workers on a shared [`TaskTracker`]. The
//! workers are built by a factory closure that receives the 0-based worker id,
//! so the pool knows nothing about what a worker does or which pipes it reads.
//! All workers observe the same [`CancellationToken`] and the pool never
//! resizes after launch.

use crate::server::stage::Stage;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

pub struct WorkerPool<F> {
    size: usize,
    factory: F,
}

impl<F, S> WorkerPool<F>
where
    F: Fn(usize) -> S,
    S: Stage,
{
    pub const fn new(size: usize, factory: F) -> Self {
        Self { size, factory }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Builds and spawns every worker, then returns without waiting for them.
    ///
    /// Each worker is registered on `tracker`, so waiting on the tracker also
    /// waits for the pool.
    pub fn launch(&self, token: &CancellationToken, tracker: &TaskTracker) {
        tracing::info!("Launch - start");

        for id in 0..self.size {
            let worker = (self.factory)(id);
            let token = token.clone();
            tracker.spawn(async move {
                tracing::debug!("Launcher  [{id}] - start");
                worker.run(token).await;
                tracing::debug!("Launcher  [{id}] - end");
            });
        }

        tracing::info!("Launch - end");
    }
}
