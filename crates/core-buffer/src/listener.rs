//! Change-listener protocol.
//!
//! Listeners observe structural edits in the exact order the primitives run;
//! during undo/redo they see the replayed (inverse or forward) sequence, not
//! the original one. The buffer holds weak handles only: a listener that is
//! dropped without deregistering is pruned at the next fan-out, and dropping
//! a buffer with live listeners is a programming error.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use core_text::Coord;

use crate::Buffer;

/// Observer of structural buffer changes.
///
/// `begin`/`end` delimit the affected span: for inserts, the coordinates of
/// the freshly inserted bytes (valid against the post-insert text); for
/// erases, the coordinates of the removed range (as they were before the
/// erase). Callbacks take `&self`; implementations use interior mutability
/// for their own state.
pub trait ChangeListener {
    fn on_insert(&self, buffer: &Buffer, begin: Coord, end: Coord);
    fn on_erase(&self, buffer: &Buffer, begin: Coord, end: Coord);
}

/// Weak-handle observer registry.
///
/// Registration goes through a shared reference: adding or removing a
/// listener does not mutate the buffer's observable text state, so the set
/// lives behind a `RefCell` (the original keeps a `mutable` member for the
/// same reason).
#[derive(Default)]
pub struct ListenerSet {
    entries: RefCell<Vec<Weak<dyn ChangeListener>>>,
}

impl ListenerSet {
    pub fn add(&self, listener: &Rc<dyn ChangeListener>) {
        let mut entries = self.entries.borrow_mut();
        let handle = Rc::downgrade(listener);
        if !entries.iter().any(|e| Weak::ptr_eq(e, &handle)) {
            entries.push(handle);
        }
    }

    pub fn remove(&self, listener: &Rc<dyn ChangeListener>) {
        let handle = Rc::downgrade(listener);
        self.entries
            .borrow_mut()
            .retain(|e| !Weak::ptr_eq(e, &handle));
    }

    /// Upgrade the live listeners for fan-out, pruning dropped ones. The
    /// returned handles keep the listeners alive for the duration of the
    /// notification pass.
    pub(crate) fn snapshot(&self) -> Vec<Rc<dyn ChangeListener>> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.strong_count() > 0);
        entries.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .all(|e| e.strong_count() == 0)
    }

    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}
