//! Worker thread that executes queued tasks

use crate::pool::task::TaskQueue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Worker thread draining the shared task queue
pub(crate) struct Worker {
    /// Worker ID
    id: usize,

    /// Worker thread handle
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Spawn a named worker thread attached to `queue`
    pub(crate) fn spawn(id: usize, queue: Arc<TaskQueue>) -> Self {
        let handle = thread::Builder::new()
            .name(format!("turnstile-worker-{}", id))
            .spawn(move || Self::run_loop(id, queue))
            .expect("failed to spawn worker thread");

        Self {
            id,
            handle: Some(handle),
        }
    }

    /// Worker thread main loop
    ///
    /// Blocks while the queue is empty; a `None` hand-off means the pool is
    /// tearing down and the backlog is drained.
    fn run_loop(id: usize, queue: Arc<TaskQueue>) {
        while let Some(task) = queue.next_task() {
            // Execute outside the queue monitor. A panicking task must not
            // take its worker down with it, or the pool would silently lose
            // capacity over time; the fault is reported and the worker goes
            // back to waiting.
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                log::error!("worker {}: task panicked: {}", id, panic_message(&payload));
            }
        }
    }

    /// Wait for the worker thread to exit
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker {} terminated abnormally", self.id);
            }
        }
    }
}

/// Best-effort human-readable form of a panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
