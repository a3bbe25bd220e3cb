//! External cancellation of blocked acquires

use parking_lot::Mutex as ParkingLotMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Callback that wakes a blocked waiter so it can observe the cancel flag
pub(crate) type WakeFn = Box<dyn Fn() + Send + Sync>;

/// Cancellation token for blocked `acquire` calls
///
/// A token is handed to `acquire_with` and shared (via `clone`) with
/// whichever context may want to abort the wait. `cancel()` makes every
/// acquire currently blocked on this token fail with
/// [`LockError::Cancelled`](crate::LockError::Cancelled) after
/// deregistering itself from the lock's waiter structures.
///
/// Cancelling is a one-way switch: once cancelled, a token never becomes
/// live again.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    /// One-way cancel flag
    cancelled: AtomicBool,

    /// Monotonic counter for waker identity
    next_waker_id: AtomicU64,

    /// Wakers for contexts currently blocked under this token
    wakers: ParkingLotMutex<Vec<(u64, WakeFn)>>,
}

impl CancelToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                next_waker_id: AtomicU64::new(0),
                wakers: ParkingLotMutex::new(Vec::new()),
            }),
        }
    }

    /// Cancel the token, waking every blocked waiter registered with it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        // Each waker locks its lock's monitor before notifying, so a waiter
        // is either before its flag check (and will see the flag) or already
        // parked (and gets the notification).
        let wakers = self.inner.wakers.lock();
        for (_, wake) in wakers.iter() {
            wake();
        }
    }

    /// Check whether the token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Register a waker for the duration of a blocked wait
    ///
    /// The registration is removed when the returned guard drops. The guard
    /// must not be dropped while the caller holds the monitor its waker
    /// locks.
    pub(crate) fn watch(&self, wake: WakeFn) -> WatchGuard {
        let id = self.inner.next_waker_id.fetch_add(1, Ordering::Relaxed);
        self.inner.wakers.lock().push((id, wake));
        WatchGuard {
            inner: self.inner.clone(),
            id,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// RAII registration of a cancel waker (deregisters on drop)
pub(crate) struct WatchGuard {
    inner: Arc<TokenInner>,
    id: u64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.inner.wakers.lock().retain(|(id, _)| *id != self.id);
    }
}
