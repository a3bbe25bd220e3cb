//! Plain exclusive lock built on a raw monitor

use crate::cancel::CancelToken;
use crate::context::ContextId;
use crate::sync::state::LockState;
use crate::{LockError, LockResult};
use crossbeam::atomic::AtomicCell;
use parking_lot::{Condvar, Mutex as ParkingLotMutex};
use std::sync::Arc;

/// Context-aware exclusive lock with no reentrancy
///
/// Unlike library mutexes this lock tracks *which* execution context holds
/// it, so `release` can reject callers that never acquired it. There is no
/// ordering guarantee among blocked waiters: all of them share one wake
/// signal, and any one of them may win the race to re-acquire (unfair by
/// design; [`FairReentrantMutex`](crate::sync::FairReentrantMutex) exists
/// for strict FIFO handoff).
///
/// Re-acquiring while already the owner blocks forever. Use
/// [`ReentrantMutex`](crate::sync::ReentrantMutex) when an owner must be
/// able to nest acquires.
pub struct Mutex {
    shared: Arc<MutexShared>,
}

struct MutexShared {
    /// Authoritative ownership state, mutated only under this monitor
    state: ParkingLotMutex<LockState>,

    /// Wake signal shared by every blocked waiter
    available: Condvar,

    /// Lock-free mirror of the current owner (introspection only)
    owner: AtomicCell<Option<ContextId>>,
}

impl Mutex {
    /// Create a new, unlocked mutex
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MutexShared {
                state: ParkingLotMutex::new(LockState::Unlocked),
                available: Condvar::new(),
                owner: AtomicCell::new(None),
            }),
        }
    }

    /// Acquire the lock, blocking while another context holds it
    pub fn acquire(&self) -> LockResult<()> {
        self.acquire_inner(None)
    }

    /// Acquire the lock, failing with [`LockError::Cancelled`] if `token`
    /// is cancelled while blocked
    pub fn acquire_with(&self, token: &CancelToken) -> LockResult<()> {
        self.acquire_inner(Some(token))
    }

    fn acquire_inner(&self, token: Option<&CancelToken>) -> LockResult<()> {
        let me = ContextId::current();

        // The waker takes the monitor before notifying, so a cancel cannot
        // slip between the flag check below and the wait.
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
                // A release may have aimed its single wake at us; pass it on
                // so the remaining waiters are not stranded.
                self.shared.available.notify_one();
                return Err(LockError::Cancelled);
            }

            self.shared.available.wait(&mut state);
        }
    }

    /// Acquire the lock only if it is free at the instant of the call
    ///
    /// Never blocks. Returns `false` while the lock is held by anyone,
    /// including the calling context.
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

    /// Release the lock and wake one blocked waiter, if any
    ///
    /// Fails with [`LockError::NotOwner`] if the calling context does not
    /// hold the lock; the state is left unchanged in that case.
    pub fn release(&self) -> LockResult<()> {
        let me = ContextId::current();
        let mut state = self.shared.state.lock();

        if state.is_owned_by(me) {
            *state = LockState::Unlocked;
            self.shared.owner.store(None);
            self.shared.available.notify_one();
            Ok(())
        } else {
            Err(LockError::NotOwner(me))
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
}

impl crate::sync::Lock for Mutex {
    fn acquire(&self) -> LockResult<()> {
        Mutex::acquire(self)
    }

    fn acquire_with(&self, token: &CancelToken) -> LockResult<()> {
        Mutex::acquire_with(self, token)
    }

    fn release(&self) -> LockResult<()> {
        Mutex::release(self)
    }

    fn try_acquire(&self) -> bool {
        Mutex::try_acquire(self)
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex").field("owner", &self.owner()).finish()
    }
}
