//! RAII guards for automatic lock release

use crate::sync::Lock;
use crate::LockResult;
use std::sync::Arc;

/// RAII guard that releases a lock on drop
///
/// Ensures the lock is released when the guard goes out of scope, even on
/// a panic, preventing deadlocks caused by a forgotten `release`. Errors
/// during the drop-release are ignored; use [`LockGuard::release`] for a
/// checked release.
pub struct LockGuard<'a, L: Lock> {
    /// The held lock
    lock: &'a L,
    /// Whether the guard has been manually released
    released: bool,
}

impl<'a, L: Lock> LockGuard<'a, L> {
    /// Create a guard for a lock the calling context already holds
    pub(crate) fn new(lock: &'a L) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Release the lock early, surfacing any release failure
    pub fn release(mut self) -> LockResult<()> {
        self.released = true;
        self.lock.release()
    }
}

impl<L: Lock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.lock.release();
        }
    }
}

/// RAII guard owning an `Arc` to its lock
///
/// The owned variant can outlive the scope that created the lock handle,
/// e.g. when a guard is moved into a worker task.
pub struct OwnedLockGuard<L: Lock> {
    /// The held lock
    lock: Arc<L>,
    /// Whether the guard has been manually released
    released: bool,
}

impl<L: Lock> OwnedLockGuard<L> {
    /// Create a guard for a lock the calling context already holds
    pub(crate) fn new(lock: Arc<L>) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Release the lock early, surfacing any release failure
    pub fn release(mut self) -> LockResult<()> {
        self.released = true;
        self.lock.release()
    }

    /// Get a reference to the underlying lock
    pub fn lock(&self) -> &Arc<L> {
        &self.lock
    }
}

impl<L: Lock> Drop for OwnedLockGuard<L> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.lock.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{FairReentrantMutex, Mutex, ReentrantMutex};

    #[test]
    fn test_guard_releases_on_drop() {
        let mutex = Mutex::new();

        {
            let _guard = mutex.acquire_scoped().unwrap();
            assert!(mutex.is_held());
        }

        assert!(!mutex.is_held());
    }

    #[test]
    fn test_guard_manual_release() {
        let mutex = ReentrantMutex::new();

        let guard = mutex.acquire_scoped().unwrap();
        assert!(mutex.is_held());

        guard.release().unwrap();
        assert!(!mutex.is_held());
    }

    #[test]
    fn test_guard_releases_one_hold() {
        let mutex = ReentrantMutex::new();
        mutex.acquire().unwrap();

        {
            let _guard = mutex.acquire_scoped().unwrap();
            assert_eq!(mutex.hold_count(), 2);
        }

        // The guard released its own hold only.
        assert_eq!(mutex.hold_count(), 1);
        mutex.release().unwrap();
    }

    #[test]
    fn test_owned_guard_releases_on_drop() {
        let mutex = Arc::new(FairReentrantMutex::new());

        {
            let _guard = mutex.clone().acquire_scoped_owned().unwrap();
            assert!(mutex.is_held());
        }

        assert!(!mutex.is_held());
    }

    #[test]
    fn test_manual_release_prevents_double_release() {
        let mutex = Mutex::new();

        let guard = mutex.acquire_scoped().unwrap();
        guard.release().unwrap();

        // The drop ran after the manual release without touching the lock;
        // a second release would have surfaced NotOwner on the next call.
        assert!(!mutex.is_held());
        assert!(mutex.try_acquire());
        mutex.release().unwrap();
    }
}
