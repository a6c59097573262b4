use std::{future::Future, num::NonZeroUsize, sync::Arc};

use tokio::{
    runtime::Handle,
    sync::{OwnedSemaphorePermit, Semaphore},
    task::{JoinError, JoinSet},
};

use super::Pool;
use crate::error::StressError;

/// Outcome of [`Pool::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Tasks that finished during the drain.
    pub joined: usize,
    /// Tasks that panicked over the whole lifetime of the pool.
    pub panicked: usize,
}

/// [`Pool`] backed by a [`Semaphore`] for capacity and a [`JoinSet`] for tracking.
///
/// - Each slot is an owned semaphore permit. The permit moves into the spawned task
///   and is released when the task completes or unwinds.
/// - Finished tasks are reaped on every submission so an unbounded run keeps a bounded
///   amount of bookkeeping.
/// - Panics are logged and counted, never propagated.
pub struct BoundedPool {
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
    capacity: NonZeroUsize,
    panicked: usize,
}

impl BoundedPool {
    /// Build a pool for `capacity` concurrent tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(capacity: NonZeroUsize) -> Result<Self, StressError> {
        if capacity.get() > Semaphore::MAX_PERMITS {
            return Err(StressError::PoolInit(format!(
                "capacity {capacity} exceeds the maximum of {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Handle::try_current().map_err(|e| StressError::PoolInit(e.to_string()))?;

        Ok(Self {
            permits: Arc::new(Semaphore::new(capacity.get())),
            tasks: JoinSet::new(),
            capacity,
            panicked: 0,
        })
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            self.observe(res);
        }
    }

    fn observe(&mut self, res: Result<(), JoinError>) {
        if let Err(e) = res {
            if e.is_panic() {
                self.panicked += 1;
                tracing::error!("Task panicked with error: {e}");
            } else {
                tracing::warn!("Task was cancelled: {e}");
            }
        }
    }
}

impl Pool for BoundedPool {
    type Slot = OwnedSemaphorePermit;

    async fn reserve(&mut self) -> Result<Self::Slot, StressError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| StressError::Submission(e.to_string()))
    }

    fn submit<T>(&mut self, slot: Self::Slot, task: T) -> Result<(), StressError>
    where
        T: Future<Output = ()> + Send + 'static,
    {
        self.reap();
        self.tasks.spawn(async move {
            let _slot = slot;
            task.await;
        });
        Ok(())
    }

    fn in_flight(&self) -> usize {
        // A task gives its permit back as soon as it finishes, before it is joined.
        self.capacity.get().saturating_sub(self.permits.available_permits())
    }

    async fn drain(&mut self) -> DrainStats {
        let mut joined = 0;
        while let Some(res) = self.tasks.join_next().await {
            joined += 1;
            self.observe(res);
        }
        DrainStats {
            joined,
            panicked: self.panicked,
        }
    }
}
