//! FIFO-fair reentrant lock with an explicit waiter queue

use crate::cancel::CancelToken;
use crate::context::ContextId;
use crate::sync::state::LockState;
use crate::{LockError, LockResult};
use crossbeam::atomic::AtomicCell;
use parking_lot::{Condvar, Mutex as ParkingLotMutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reentrant lock that hands itself to blocked contexts in strict arrival
/// order
///
/// Every context that has to block gets its own queue entry with a private
/// wake signal. `release` signals only the entry at the head of the queue,
/// and a woken waiter re-checks under the monitor that the lock is free
/// *and* that it is still the head before claiming ownership. The double
/// condition under a loop defends against spurious and stale wakeups, and
/// is what guarantees that no later arrival ever barges ahead of an
/// earlier, still-waiting one.
///
/// `try_acquire` is the one deliberate exception: it ignores the queue
/// entirely and may take a free lock ahead of queued waiters.
pub struct FairReentrantMutex {
    shared: Arc<FairShared>,
}

struct FairShared {
    /// Authoritative state, mutated only under this monitor
    state: ParkingLotMutex<FairState>,

    /// Lock-free mirror of the current owner (introspection only)
    owner: AtomicCell<Option<ContextId>>,
}

struct FairState {
    /// Ownership and hold count
    hold: LockState,

    /// Blocked contexts in arrival order; never reordered
    waiters: VecDeque<Arc<Waiter>>,

    /// Monotonic counter for waiter identity
    next_waiter_id: u64,
}

/// One queued, blocked context
struct Waiter {
    /// Identity within the owning lock's queue
    id: u64,

    /// Set by `release` (or a cancelling peer) when this waiter is the
    /// designated next owner; mutated only under the lock monitor
    signaled: AtomicBool,

    /// Private wake signal, never broadcast
    wake: Condvar,
}

impl FairReentrantMutex {
    /// Create a new, unlocked mutex
    pub fn new() -> Self {
        Self {
            shared: Arc::new(FairShared {
                state: ParkingLotMutex::new(FairState {
                    hold: LockState::Unlocked,
                    waiters: VecDeque::new(),
                    next_waiter_id: 0,
                }),
                owner: AtomicCell::new(None),
            }),
        }
    }

    /// Acquire the lock, blocking in FIFO order while it is held elsewhere
    ///
    /// If the calling context already holds the lock the hold count is
    /// incremented and the call returns immediately without touching the
    /// queue.
    pub fn acquire(&self) -> LockResult<()> {
        self.acquire_inner(None)
    }

    /// Acquire the lock, failing with [`LockError::Cancelled`] if `token`
    /// is cancelled while blocked
    ///
    /// A cancelled waiter removes its queue entry before surfacing the
    /// failure, and hands the head signal on if it held one, so the
    /// remaining waiters keep acquiring in their original relative order.
    pub fn acquire_with(&self, token: &CancelToken) -> LockResult<()> {
        self.acquire_inner(Some(token))
    }

    fn acquire_inner(&self, token: Option<&CancelToken>) -> LockResult<()> {
        let me = ContextId::current();

        let waiter = {
            let mut state = self.shared.state.lock();

            // Reentrant fast path: no queue interaction.
            if let LockState::Locked { owner, count } = state.hold {
                if owner == me {
                    state.hold = LockState::Locked { owner, count: count + 1 };
                    return Ok(());
                }
            }

            // Free with nobody queued ahead: claiming now is equivalent to
            // enqueueing and immediately dequeueing as head.
            if state.hold.is_unlocked() && state.waiters.is_empty() {
                state.hold = LockState::Locked { owner: me, count: 1 };
                self.shared.owner.store(Some(me));
                return Ok(());
            }

            // FIFO priority is fixed here, at enqueue time.
            let id = state.next_waiter_id;
            state.next_waiter_id += 1;
            let waiter = Arc::new(Waiter {
                id,
                signaled: AtomicBool::new(false),
                wake: Condvar::new(),
            });
            state.waiters.push_back(waiter.clone());
            waiter
        };

        // The waker takes the monitor before notifying, so a cancel cannot
        // slip between the flag check below and the wait.
        let _watch = token.map(|token| {
            let shared = Arc::clone(&self.shared);
            let waiter = waiter.clone();
            token.watch(Box::new(move || {
                let _guard = shared.state.lock();
                waiter.wake.notify_one();
            }))
        });

        let mut state = self.shared.state.lock();
        loop {
            let is_head = state
                .waiters
                .front()
                .is_some_and(|head| head.id == waiter.id);
            if state.hold.is_unlocked() && is_head {
                state.waiters.pop_front();
                state.hold = LockState::Locked { owner: me, count: 1 };
                self.shared.owner.store(Some(me));
                return Ok(());
            }

            if token.is_some_and(CancelToken::is_cancelled) {
                state.waiters.retain(|queued| queued.id != waiter.id);
                // If the lock is free the head signal may have been aimed at
                // us; hand it to the new head or the queue would stall.
                if state.hold.is_unlocked() {
                    if let Some(head) = state.waiters.front() {
                        head.signaled.store(true, Ordering::Relaxed);
                        head.wake.notify_one();
                    }
                }
                return Err(LockError::Cancelled);
            }

            // Block on this waiter's private signal. The monitor is released
            // while parked and atomically reacquired on wake; the outer loop
            // then re-checks both conditions.
            while !waiter.signaled.load(Ordering::Relaxed) {
                waiter.wake.wait(&mut state);
                if token.is_some_and(CancelToken::is_cancelled) {
                    break;
                }
            }
            waiter.signaled.store(false, Ordering::Relaxed);
        }
    }

    /// Acquire the lock only if it is free at the instant of the call
    ///
    /// Never blocks, ignores both the waiter queue and reentrancy: the call
    /// fails while the lock is held by anyone (including the calling
    /// context) and may barge ahead of queued waiters when it is free.
    pub fn try_acquire(&self) -> bool {
        let me = ContextId::current();
        let mut state = self.shared.state.lock();

        if state.hold.is_unlocked() {
            state.hold = LockState::Locked { owner: me, count: 1 };
            self.shared.owner.store(Some(me));
            true
        } else {
            false
        }
    }

    /// Release one hold on the lock
    ///
    /// When the hold count returns to zero the lock becomes free and only
    /// the current head of the waiter queue is signaled — never a
    /// broadcast. Fails with [`LockError::NotOwner`] if the calling context
    /// does not hold the lock; the state is left unchanged in that case.
    pub fn release(&self) -> LockResult<()> {
        let me = ContextId::current();
        let mut state = self.shared.state.lock();

        match state.hold {
            LockState::Locked { owner, count } if owner == me => {
                if count == 1 {
                    state.hold = LockState::Unlocked;
                    self.shared.owner.store(None);
                    if let Some(head) = state.waiters.front() {
                        head.signaled.store(true, Ordering::Relaxed);
                        head.wake.notify_one();
                    }
                } else {
                    state.hold = LockState::Locked { owner, count: count - 1 };
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
        match self.shared.state.lock().hold {
            LockState::Unlocked => 0,
            LockState::Locked { count, .. } => count,
        }
    }

    /// Number of contexts currently queued waiting for the lock
    pub fn waiting_count(&self) -> usize {
        self.shared.state.lock().waiters.len()
    }
}

impl crate::sync::Lock for FairReentrantMutex {
    fn acquire(&self) -> LockResult<()> {
        FairReentrantMutex::acquire(self)
    }

    fn acquire_with(&self, token: &CancelToken) -> LockResult<()> {
        FairReentrantMutex::acquire_with(self, token)
    }

    fn release(&self) -> LockResult<()> {
        FairReentrantMutex::release(self)
    }

    fn try_acquire(&self) -> bool {
        FairReentrantMutex::try_acquire(self)
    }
}

impl Default for FairReentrantMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FairReentrantMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FairReentrantMutex")
            .field("owner", &self.owner())
            .field("waiting", &self.waiting_count())
            .finish()
    }
}
