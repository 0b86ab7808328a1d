//! Task Pool Module
//!
//! Bounded worker pool with a non-blocking submission fallback: when the
//! queue is full (or the pool is closed) the task is spawned directly on the
//! runtime instead of being dropped or blocking the submitter.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

const DEFAULT_SIZE: usize = 1;
const DEFAULT_QUEUE: usize = 1000;

struct PoolInner {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

// == Task Pool ==
/// Fixed set of workers draining a bounded queue of boxed futures.
///
/// Handles are cheap clones sharing one pool.
#[derive(Clone)]
pub struct TaskPool {
    inner: Arc<PoolInner>,
}

impl TaskPool {
    /// Creates a pool of `size` workers over a queue of `queue_size` slots.
    /// Zero values fall back to defaults (1 worker, 1000 slots).
    ///
    /// Must be called within a tokio runtime.
    pub fn new(size: usize, queue_size: usize) -> Self {
        let size = if size == 0 { DEFAULT_SIZE } else { size };
        let queue_size = if queue_size == 0 {
            DEFAULT_QUEUE
        } else {
            queue_size
        };

        let (tx, rx) = mpsc::channel::<Task>(queue_size);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut workers = Vec::with_capacity(size);
        for _ in 0..size {
            let rx = rx.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let task = rx.lock().await.recv().await;
                    match task {
                        Some(task) => task.await,
                        None => break,
                    }
                }
            }));
        }

        Self {
            inner: Arc::new(PoolInner {
                sender: Mutex::new(Some(tx)),
                workers: Mutex::new(workers),
            }),
        }
    }

    // == Submit ==
    /// Queues `task` without blocking. A task that does not fit the queue
    /// (or arrives after close) runs as its own spawned task; nothing is
    /// ever dropped.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task: Task = Box::pin(task);
        let rejected = {
            let sender = self.inner.sender.lock();
            match sender.as_ref() {
                Some(tx) => match tx.try_send(task) {
                    Ok(()) => None,
                    Err(mpsc::error::TrySendError::Full(task))
                    | Err(mpsc::error::TrySendError::Closed(task)) => Some(task),
                },
                None => Some(task),
            }
        };
        if let Some(task) = rejected {
            tokio::spawn(task);
        }
    }

    // == Close ==
    /// Closes the queue and waits for the workers to drain it. Idempotent.
    pub async fn close(&self) {
        // dropping the sender ends the workers' recv loop
        self.inner.sender.lock().take();
        let workers = {
            let mut guard = self.inner.workers.lock();
            std::mem::take(&mut *guard)
        };
        for worker in workers {
            let _ = worker.await;
        }
    }
}
