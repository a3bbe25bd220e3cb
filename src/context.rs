//! Execution-context identity

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an execution context (an OS thread)
///
/// Every thread is assigned an id lazily on first use; the same thread
/// always observes the same id and two live threads never share one.
/// Lock ownership is tracked in terms of these ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

impl ContextId {
    /// Get the calling thread's id, assigning one on first use
    pub fn current() -> Self {
        CURRENT.with(|cell| match cell.get() {
            Some(id) => id,
            None => {
                let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
                cell.set(Some(id));
                id
            }
        })
    }

    /// Get the numeric id value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Create a ContextId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        ContextId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_id_stable_within_thread() {
        let first = ContextId::current();
        let second = ContextId::current();
        assert_eq!(first, second);
    }

    #[test]
    fn test_context_id_distinct_across_threads() {
        let here = ContextId::current();
        let there = std::thread::spawn(ContextId::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_context_id_round_trip() {
        let id = ContextId::current();
        assert_eq!(ContextId::from_u64(id.as_u64()), id);
    }
}
