//! Ownership state shared by the lock types

use crate::context::ContextId;

/// Tagged ownership state of a lock instance
///
/// `count` is defined and >= 1 exactly while the lock is held; there is
/// never more than one owner. The plain mutex keeps `count` pinned at 1,
/// the reentrant variants use it as the hold count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockState {
    /// No owner
    Unlocked,
    /// Held by `owner`, re-entered `count` times
    Locked {
        /// The holding context
        owner: ContextId,
        /// Hold count, always >= 1
        count: usize,
    },
}

impl LockState {
    /// Current owner, if any
    pub(crate) fn owner(&self) -> Option<ContextId> {
        match self {
            LockState::Unlocked => None,
            LockState::Locked { owner, .. } => Some(*owner),
        }
    }

    /// Whether the lock is currently free
    pub(crate) fn is_unlocked(&self) -> bool {
        matches!(self, LockState::Unlocked)
    }

    /// Whether `id` is the current owner
    pub(crate) fn is_owned_by(&self, id: ContextId) -> bool {
        self.owner() == Some(id)
    }
}
