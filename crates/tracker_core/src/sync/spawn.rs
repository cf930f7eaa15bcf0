//! Task spawning for fire-and-forget remote operations.
//!
//! The sync layer never blocks its caller: the startup read and every upsert
//! are handed to a [`TaskSpawner`]. Hosts pick how those tasks run:
//!
//! - [`DeferredSpawner`] queues tasks until the host drains them from its own
//!   event loop (single-threaded UI loops, tests).
//! - [`TokioSpawner`] (feature `tokio`) runs them on a tokio runtime.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::remote::BoxFuture;

/// Runs detached background tasks.
pub trait TaskSpawner: Send + Sync {
    /// Start `task` without waiting for it.
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawner that queues tasks until the host drains them.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct DeferredSpawner {
    queue: Arc<Mutex<VecDeque<BoxFuture<'static, ()>>>>,
}

impl DeferredSpawner {
    /// Create a spawner with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run queued tasks in FIFO order until the queue is empty, including
    /// tasks queued by the tasks themselves. Returns how many ran.
    pub async fn drain(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop() {
            task.await;
            ran += 1;
        }
        ran
    }

    /// Run only the oldest queued task. Returns `false` if the queue was empty.
    pub async fn run_next(&self) -> bool {
        match self.pop() {
            Some(task) => {
                task.await;
                true
            }
            None => false,
        }
    }

    /// Blocking wrapper for [`DeferredSpawner::drain`].
    pub fn run_pending(&self) -> usize {
        futures_lite::future::block_on(self.drain())
    }

    /// Blocking wrapper for [`DeferredSpawner::run_next`].
    pub fn run_one(&self) -> bool {
        futures_lite::future::block_on(self.run_next())
    }

    fn pop(&self) -> Option<BoxFuture<'static, ()>> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl TaskSpawner for DeferredSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }
}

impl std::fmt::Debug for DeferredSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSpawner")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Spawner running tasks on a tokio runtime.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioSpawner {
    /// Spawn onto the given runtime.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawn onto the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

#[cfg(feature = "tokio")]
impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        drop(self.handle.spawn(task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tasks_wait_for_drain() {
        let spawner = DeferredSpawner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        spawner.spawn(Box::pin(async move {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(spawner.pending(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(spawner.run_pending(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(spawner.pending(), 0);
    }

    #[test]
    fn test_drain_runs_tasks_spawned_by_tasks() {
        let spawner = DeferredSpawner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_spawner = spawner.clone();
        let counter_clone = Arc::clone(&counter);
        spawner.spawn(Box::pin(async move {
            let counter_inner = Arc::clone(&counter_clone);
            inner_spawner.spawn(Box::pin(async move {
                counter_inner.fetch_add(10, Ordering::SeqCst);
            }));
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(spawner.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_run_one_is_fifo() {
        let spawner = DeferredSpawner::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            spawner.spawn(Box::pin(async move {
                order.lock().unwrap().push(i);
            }));
        }

        assert!(spawner.run_one());
        assert_eq!(*order.lock().unwrap(), vec![0]);
        assert_eq!(spawner.run_pending(), 2);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(!spawner.run_one());
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_tokio_spawner_runs_task() {
        let spawner = TokioSpawner::current();
        let (tx, rx) = tokio::sync::oneshot::channel();

        spawner.spawn(Box::pin(async move {
            let _ = tx.send(42);
        }));

        assert_eq!(rx.await.unwrap(), 42);
    }
}
