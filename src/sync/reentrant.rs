//! Reentrant lock with per-owner hold counting

use crate::cancel::CancelToken;
use crate::context::ContextId;
use crate::sync::state::LockState;
use crate::{LockError, LockResult};
use crossbeam::atomic::AtomicCell;
use parking_lot::{Condvar, Mutex as ParkingLotMutex};
use std::sync::Arc;

/// Exclusive lock the owning context may re-acquire without blocking
///
/// Each nested `acquire` by the owner increments a hold count and each
/// `release` decrements it; the lock only becomes free (and a waiter is
/// only woken) when the count returns to zero. Waiters share a single wake
/// signal, so there is no ordering guarantee among them — see
/// [`FairReentrantMutex`](crate::sync::FairReentrantMutex) for strict FIFO
/// handoff.
pub struct ReentrantMutex {
    shared: Arc<ReentrantShared>,
}

struct ReentrantShared {
    /// Authoritative ownership state, mutated only under this monitor
    state: ParkingLotMutex<LockState>,

    /// Wake signal shared by every blocked waiter
    available: Condvar,

    /// Lock-free mirror of the current owner (introspection only)
    owner: AtomicCell<Option<ContextId>>,
}

impl ReentrantMutex {
    /// Create a new, unlocked mutex
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ReentrantShared {
                state: ParkingLotMutex::new(LockState::Unlocked),
                available: Condvar::new(),
                owner: AtomicCell::new(None),
            }),
        }
    }

    /// Acquire the lock, blocking while another context holds it
    ///
    /// If the calling context already holds the lock the hold count is
    /// incremented and the call returns immediately.
    pub fn acquire(&self) -> LockResult<()> {
        self.acquire_inner(None)
    }

    /// Acquire the lock, failing with [`LockError::Cancelled`] if `token`
    /// is cancelled while blocked
    ///
    /// The reentrant fast path never blocks and therefore never observes
    /// the token.
    pub fn acquire_with(&self, token: &CancelToken) -> LockResult<()> {
        self.acquire_inner(Some(token))
    }

    fn acquire_inner(&self, token: Option<&CancelToken>) -> LockResult<()> {
        let me = ContextId::current();

        // Reentrant fast path: no blocking, no queue interaction.
        {
            let mut state = self.shared.state.lock();
            if let LockState::Locked { owner, count } = *state {
                if owner == me {
                    *state = LockState::Locked { owner, count: count + 1 };
                    return Ok(());
                }
            }
        }

        let _watch = token.map(|token| {
            let shared = Arc::clone(&self.shared);
            token.watch(Box::new(move || {
                let _guard = shared.state.lock();
                shared.available.notify_all();
            }))
        });

        let mut state = self.shared.state.lock();
        loop {
            if state.is_unlocked() {
                *state = LockState::Locked { owner: me, count: 1 };
                self.shared.owner.store(Some(me));
                return Ok(());
            }

            if token.is_some_and(CancelToken::is_cancelled) {
                // Pass a possibly-consumed wake on to the remaining waiters.
                self.shared.available.notify_one();
                return Err(LockError::Cancelled);
            }

            self.shared.available.wait(&mut state);
        }
    }

    /// Acquire the lock only if it is free at the instant of the call
    ///
    /// Never blocks. Returns `false` while the lock is held by anyone —
    /// including the calling context: the non-blocking variant deliberately
    /// has no reentrant fast path. Use `acquire` to nest holds.
    pub fn try_acquire(&self) -> bool {
        let me = ContextId::current();
        let mut state = self.shared.state.lock();

        if state.is_unlocked() {
            *state = LockState::Locked { owner: me, count: 1 };
            self.shared.owner.store(Some(me));
            true
        } else {
            false
        }
    }

    /// Release one hold on the lock
    ///
    /// Only when the hold count returns to zero does the lock become free
    /// and one blocked waiter get woken. Fails with [`LockError::NotOwner`]
    /// if the calling context does not hold the lock; the state is left
    /// unchanged in that case.
    pub fn release(&self) -> LockResult<()> {
        let me = ContextId::current();
        let mut state = self.shared.state.lock();

        match *state {
            LockState::Locked { owner, count } if owner == me => {
                if count == 1 {
                    *state = LockState::Unlocked;
                    self.shared.owner.store(None);
                    self.shared.available.notify_one();
                } else {
                    *state = LockState::Locked { owner, count: count - 1 };
                }
                Ok(())
            }
            _ => Err(LockError::NotOwner(me)),
        }
    }

    /// Current owner, if any
    pub fn owner(&self) -> Option<ContextId> {
        self.shared.owner.load()
    }

    /// Check if the lock is currently held
    pub fn is_held(&self) -> bool {
        self.owner().is_some()
    }

    /// Check if the lock is held by a specific context
    pub fn is_held_by(&self, id: ContextId) -> bool {
        self.owner() == Some(id)
    }

    /// Current hold count (zero when free)
    pub fn hold_count(&self) -> usize {
        match *self.shared.state.lock() {
            LockState::Unlocked => 0,
            LockState::Locked { count, .. } => count,
        }
    }
}

impl crate::sync::Lock for ReentrantMutex {
    fn acquire(&self) -> LockResult<()> {
        ReentrantMutex::acquire(self)
    }

    fn acquire_with(&self, token: &CancelToken) -> LockResult<()> {
        ReentrantMutex::acquire_with(self, token)
    }

    fn release(&self) -> LockResult<()> {
        ReentrantMutex::release(self)
    }

    fn try_acquire(&self) -> bool {
        ReentrantMutex::try_acquire(self)
    }
}

impl Default for ReentrantMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReentrantMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReentrantMutex")
            .field("owner", &self.owner())
            .field("hold_count", &self.hold_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_nested_acquire_increments_count() {
        let mutex = ReentrantMutex::new();

        mutex.acquire().unwrap();
        assert_eq!(mutex.hold_count(), 1);

        mutex.acquire().unwrap();
        assert_eq!(mutex.hold_count(), 2);

        // First release keeps ownership.
        mutex.release().unwrap();
        assert_eq!(mutex.hold_count(), 1);
        assert!(mutex.is_held_by(ContextId::current()));

        // Second release frees the lock.
        mutex.release().unwrap();
        assert_eq!(mutex.hold_count(), 0);
        assert!(!mutex.is_held());
    }

    #[test]
    fn test_lock_frees_only_at_zero() {
        let mutex = Arc::new(ReentrantMutex::new());
        mutex.acquire().unwrap();
        mutex.acquire().unwrap();

        let contender = mutex.clone();
        let acquired = Arc::new(AtomicUsize::new(0));
        let acquired_flag = acquired.clone();
        let handle = thread::spawn(move || {
            contender.acquire().unwrap();
            acquired_flag.store(1, Ordering::SeqCst);
            contender.release().unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        mutex.release().unwrap();

        // Still held once, so the contender stays blocked.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(acquired.load(Ordering::SeqCst), 0);

        mutex.release().unwrap();
        handle.join().unwrap();
        assert_eq!(acquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_acquire_rejects_current_owner() {
        let mutex = ReentrantMutex::new();
        mutex.acquire().unwrap();

        // No reentrant fast path in the non-blocking variant.
        assert!(!mutex.try_acquire());
        assert_eq!(mutex.hold_count(), 1);

        mutex.release().unwrap();
        assert!(mutex.try_acquire());
        mutex.release().unwrap();
    }

    #[test]
    fn test_release_by_non_owner_fails() {
        let mutex = Arc::new(ReentrantMutex::new());
        mutex.acquire().unwrap();

        let stranger = mutex.clone();
        let result = thread::spawn(move || stranger.release()).join().unwrap();
        assert!(matches!(result, Err(LockError::NotOwner(_))));
        assert_eq!(mutex.hold_count(), 1);

        mutex.release().unwrap();
    }

    #[test]
    fn test_mutual_exclusion_with_nesting() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 100;

        let mutex = Arc::new(ReentrantMutex::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let mutex = mutex.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        mutex.acquire().unwrap();
                        mutex.acquire().unwrap();
                        let seen = counter.load(Ordering::SeqCst);
                        thread::yield_now();
                        counter.store(seen + 1, Ordering::SeqCst);
                        mutex.release().unwrap();
                        mutex.release().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), THREADS * ROUNDS);
    }

    #[test]
    fn test_cancel_blocked_acquire() {
        let mutex = Arc::new(ReentrantMutex::new());
        mutex.acquire().unwrap();

        let token = CancelToken::new();
        let contender = mutex.clone();
        let contender_token = token.clone();
        let handle = thread::spawn(move || contender.acquire_with(&contender_token));

        thread::sleep(Duration::from_millis(50));
        token.cancel();
        assert_eq!(handle.join().unwrap(), Err(LockError::Cancelled));

        mutex.release().unwrap();
        assert!(!mutex.is_held());
    }

    #[test]
    fn test_reentrant_fast_path_ignores_cancelled_token() {
        let mutex = ReentrantMutex::new();
        let token = CancelToken::new();
        token.cancel();

        mutex.acquire().unwrap();
        // Already the owner: the fast path must not observe the token.
        mutex.acquire_with(&token).unwrap();
        assert_eq!(mutex.hold_count(), 2);

        mutex.release().unwrap();
        mutex.release().unwrap();
    }
}
