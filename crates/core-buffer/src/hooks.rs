//! Buffer lifecycle hook events.
//!
//! The core fires a fixed set of events through an externally supplied
//! [`Hooks`] handle; the hook engine itself (user commands, filtering) lives
//! outside the buffer core. Hooks run synchronously and must not block.

use std::rc::Rc;

use crate::Buffer;

/// Lifecycle events emitted by the buffer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// A buffer was created (fires for every buffer, after BufNew/BufOpen).
    BufCreate,
    /// A file-backed buffer was created for a file that does not exist yet.
    BufNew,
    /// A file-backed buffer was created from an existing file.
    BufOpen,
    /// A buffer is being destroyed.
    BufClose,
}

impl Hook {
    pub fn name(self) -> &'static str {
        match self {
            Hook::BufCreate => "BufCreate",
            Hook::BufNew => "BufNew",
            Hook::BufOpen => "BufOpen",
            Hook::BufClose => "BufClose",
        }
    }
}

/// Hook dispatch handle held by every buffer.
///
/// During construction the hooks observe the fully loaded text while undo
/// recording is still disabled, so a hook can read the buffer but cannot
/// commit a group against half-built history.
pub trait Hooks {
    fn run_hook(&self, hook: Hook, param: &str, buffer: &Buffer);
}

/// Default dispatch that drops every event.
pub struct NoopHooks;

impl Hooks for NoopHooks {
    fn run_hook(&self, _hook: Hook, _param: &str, _buffer: &Buffer) {}
}

/// Shared no-op handle for buffers created without a hook engine.
pub fn noop_hooks() -> Rc<dyn Hooks> {
    Rc::new(NoopHooks)
}
