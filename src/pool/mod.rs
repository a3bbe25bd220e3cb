//! Producer/consumer worker pool
//!
//! A fixed set of worker threads drains one shared FIFO task queue, built
//! on the same monitor pattern as the lock types: the queue state lives
//! behind one internal mutex, and workers block on a condition variable
//! while it is empty.

mod pool;
mod task;
mod worker;

pub use pool::WorkerPool;
pub use task::Task;
