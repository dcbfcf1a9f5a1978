//! Notification Context
//!
//! The notification context tracks which cells are currently running a
//! subscriber pass on this thread. A write consults it to detect that it is
//! reentrant (issued by a subscriber of the same cell) and how deep the
//! reentrancy goes.
//!
//! # Implementation
//!
//! We use a thread-local stack. When a cell starts a pass it pushes its ID;
//! the returned guard pops it when the pass finishes, even if a subscriber
//! panics. Passes on different cells nest freely; only repeated entries for
//! the same cell count towards its depth.

use std::cell::RefCell;

use super::cell::CellId;

thread_local! {
    static NOTIFY_STACK: RefCell<Vec<CellId>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one in-flight subscriber pass.
pub(crate) struct NotifyContext {
    cell: CellId,
}

impl NotifyContext {
    /// Record that `cell` is starting a pass.
    ///
    /// The entry is removed when the returned guard is dropped.
    pub(crate) fn enter(cell: CellId) -> Self {
        NOTIFY_STACK.with(|stack| stack.borrow_mut().push(cell));
        Self { cell }
    }

    /// Number of passes currently in flight for `cell`.
    pub(crate) fn depth(cell: CellId) -> usize {
        NOTIFY_STACK.with(|stack| stack.borrow().iter().filter(|c| **c == cell).count())
    }

    /// Whether `cell` is currently running a pass.
    pub(crate) fn is_notifying(cell: CellId) -> bool {
        Self::depth(cell) > 0
    }

    /// Total number of passes in flight on this thread, across all cells.
    #[cfg(test)]
    pub(crate) fn total_depth() -> usize {
        NOTIFY_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for NotifyContext {
    fn drop(&mut self) {
        NOTIFY_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(cell) = popped {
                debug_assert_eq!(
                    cell, self.cell,
                    "NotifyContext mismatch: expected {:?}, got {:?}",
                    self.cell, cell
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_cell() {
        let id = CellId::new();

        assert!(!NotifyContext::is_notifying(id));
        {
            let _ctx = NotifyContext::enter(id);
            assert!(NotifyContext::is_notifying(id));
            assert_eq!(NotifyContext::depth(id), 1);
        }

        assert!(!NotifyContext::is_notifying(id));
        assert_eq!(NotifyContext::total_depth(), 0);
    }

    #[test]
    fn depth_counts_only_matching_cell() {
        let a = CellId::new();
        let b = CellId::new();

        let _outer = NotifyContext::enter(a);
        {
            let _inner = NotifyContext::enter(b);
            let _again = NotifyContext::enter(a);

            assert_eq!(NotifyContext::depth(a), 2);
            assert_eq!(NotifyContext::depth(b), 1);
            assert_eq!(NotifyContext::total_depth(), 3);
        }

        assert_eq!(NotifyContext::depth(a), 1);
        assert!(!NotifyContext::is_notifying(b));
    }
}
