//! Turnstile synchronization primitives
//!
//! From-scratch mutual-exclusion primitives and a fixed-size worker pool,
//! built directly on low-level monitor primitives (a raw mutex plus
//! condition-variable wait/notify) instead of a higher-level lock library:
//!
//! - Plain [`Mutex`] — exclusive, non-reentrant, unordered waiters
//! - [`ReentrantMutex`] — per-owner hold count
//! - [`FairReentrantMutex`] — strict FIFO handoff via an explicit waiter
//!   queue with per-waiter signaling
//! - [`WorkerPool`] — fixed worker set draining a shared FIFO task queue
//!
//! Each object protects its state behind exactly one internal monitor;
//! blocking operations release the monitor while suspended and reacquire
//! it atomically on wake. Blocked acquires can be aborted externally
//! through a [`CancelToken`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cancel;
pub mod context;
pub mod pool;
pub mod sync;

pub use cancel::CancelToken;
pub use context::ContextId;
pub use pool::{Task, WorkerPool};
pub use sync::{FairReentrantMutex, Lock, LockGuard, Mutex, OwnedLockGuard, ReentrantMutex};

/// Failures surfaced by lock operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// A blocked `acquire` was cancelled through its token
    #[error("wait cancelled while blocked acquiring the lock")]
    Cancelled,

    /// `release` was called by a context that does not hold the lock
    #[error("release called by non-owner context {0:?}")]
    NotOwner(ContextId),
}

/// Result of a lock operation
pub type LockResult<T> = Result<T, LockError>;
