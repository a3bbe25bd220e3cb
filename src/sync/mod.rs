//! Monitor-based mutual-exclusion primitives
//!
//! Three lock flavors built from scratch on the same raw monitor pattern
//! (one internal mutex per instance plus condition-variable wait/notify),
//! each tracking which execution context owns it:
//!
//! - [`Mutex`] — exclusive, no reentrancy, no waiter ordering
//! - [`ReentrantMutex`] — adds a per-owner hold count
//! - [`FairReentrantMutex`] — adds a FIFO waiter queue with per-waiter
//!   signaling for strict arrival-order handoff

mod fair;
mod guard;
mod mutex;
mod reentrant;
mod state;

pub use fair::FairReentrantMutex;
pub use guard::{LockGuard, OwnedLockGuard};
pub use mutex::Mutex;
pub use reentrant::ReentrantMutex;

use crate::cancel::CancelToken;
use crate::LockResult;
use std::sync::Arc;

/// Surface shared by every lock type in this module
///
/// All three locks expose the same operations; the trait makes that shape
/// explicit and lets the RAII guards work over any of them.
pub trait Lock {
    /// Acquire the lock, blocking while it is unavailable
    fn acquire(&self) -> LockResult<()>;

    /// Acquire the lock, failing with
    /// [`LockError::Cancelled`](crate::LockError::Cancelled) if `token` is
    /// cancelled while blocked
    fn acquire_with(&self, token: &CancelToken) -> LockResult<()>;

    /// Release the lock, failing with
    /// [`LockError::NotOwner`](crate::LockError::NotOwner) if the calling
    /// context does not hold it
    fn release(&self) -> LockResult<()>;

    /// Acquire the lock only if it is free at the instant of the call,
    /// without blocking
    fn try_acquire(&self) -> bool;

    /// Acquire and wrap the hold in an RAII guard that releases on drop
    fn acquire_scoped(&self) -> LockResult<LockGuard<'_, Self>>
    where
        Self: Sized,
    {
        self.acquire()?;
        Ok(LockGuard::new(self))
    }

    /// Acquire and wrap the hold in an owned, `Arc`-carrying RAII guard
    fn acquire_scoped_owned(self: Arc<Self>) -> LockResult<OwnedLockGuard<Self>>
    where
        Self: Sized,
    {
        self.acquire()?;
        Ok(OwnedLockGuard::new(self))
    }
}
