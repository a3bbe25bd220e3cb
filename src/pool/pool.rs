//! Fixed-size worker pool over a shared FIFO queue

use crate::pool::task::TaskQueue;
use crate::pool::worker::Worker;
use std::sync::Arc;

/// Fixed set of worker threads draining a shared FIFO task queue
///
/// The pool size is fixed at construction and never changes afterwards: a
/// task that panics is isolated and reported, never allowed to shrink the
/// pool. Submission is fire-and-forget — there is no result handle and no
/// task-level failure reporting back to the submitter.
///
/// Tasks dequeue in submission order, but with more than one worker the
/// completion order across tasks is unspecified.
///
/// Dropping the pool closes the queue, lets the workers finish the
/// remaining backlog, and joins them, so every submitted task still runs
/// exactly once.
pub struct WorkerPool {
    /// Shared task queue
    queue: Arc<TaskQueue>,

    /// Worker threads, one entry per configured worker
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Create a pool and immediately start `worker_count` workers
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker pool needs at least one worker");

        let queue = Arc::new(TaskQueue::new());
        let workers = (0..worker_count)
            .map(|id| Worker::spawn(id, queue.clone()))
            .collect();

        Self { queue, workers }
    }

    /// Create a pool with one worker per available CPU
    pub fn with_default_size() -> Self {
        Self::new(num_cpus::get())
    }

    /// Enqueue a task and wake a blocked worker
    ///
    /// Returns immediately; the task runs at some later point on one of the
    /// pool's workers. The queue is unbounded, so submission never blocks.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.push(Box::new(task));
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks submitted but not yet picked up by a worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.queue.close();
        for worker in &mut self.workers {
            worker.join();
        }
    }
}
