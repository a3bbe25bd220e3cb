//! Shared FIFO queue feeding the pool workers

use parking_lot::{Condvar, Mutex as ParkingLotMutex};
use std::collections::VecDeque;

/// A unit of work submitted to the pool
///
/// Fire-and-forget: no return value and no handle. A task is owned solely
/// by the queue from submission until a worker dequeues it.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Monitor-protected FIFO task queue
///
/// Unbounded: submission never blocks and applies no backpressure, so a
/// producer that outpaces the workers grows the queue without limit.
pub(crate) struct TaskQueue {
    /// Pending tasks and teardown flag, mutated only under this monitor
    state: ParkingLotMutex<QueueState>,

    /// Signals workers that a task (or teardown) is available
    available: Condvar,
}

struct QueueState {
    /// Pending tasks in submission order
    tasks: VecDeque<Task>,

    /// Set once when the owning pool is torn down
    closed: bool,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: ParkingLotMutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a task at the tail and wake one blocked worker
    pub(crate) fn push(&self, task: Task) {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        self.available.notify_one();
    }

    /// Dequeue the head task, blocking while the queue is empty
    ///
    /// Returns `None` only after the queue is closed *and* the backlog is
    /// drained, so every submitted task is handed to exactly one worker.
    pub(crate) fn next_task(&self) -> Option<Task> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Close the queue and wake every worker so it can drain and exit
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.available.notify_all();
    }

    /// Number of tasks submitted but not yet dequeued
    pub(crate) fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_fifo() {
        let queue = TaskQueue::new();
        queue.push(Box::new(|| {}));
        queue.push(Box::new(|| {}));
        assert_eq!(queue.len(), 2);

        queue.next_task().unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_closed_queue_drains_before_ending() {
        let queue = TaskQueue::new();
        queue.push(Box::new(|| {}));
        queue.close();

        // The backlog survives the close.
        assert!(queue.next_task().is_some());
        assert!(queue.next_task().is_none());
    }
}
