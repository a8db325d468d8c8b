//! Editable buffer: the in-memory representation of one text document.
//!
//! [`Buffer`] owns a [`core_text::LineStore`] and layers editing semantics on
//! top of it:
//!
//! - the recording façade [`insert`](Buffer::insert)/[`erase`](Buffer::erase)
//!   appends a [`Modification`] to the open undo group, then runs the
//!   structural primitive and fans the change out to registered listeners;
//! - [`commit_undo_group`](Buffer::commit_undo_group) normalizes the open
//!   group through the optimizer and appends it to the history;
//! - [`undo`](Buffer::undo)/[`redo`](Buffer::redo) replay committed groups
//!   through the same primitives (inverse order for undo), without
//!   re-recording;
//! - the save index tracks where [`notify_saved`](Buffer::notify_saved) last
//!   pointed, backing [`is_modified`](Buffer::is_modified).
//!
//! Construction installs the initial lines with undo recording disabled and
//! fires the `BufNew`/`BufOpen` and `BufCreate` hooks before enabling it, so
//! lifecycle hooks can never commit a group against a half-built buffer.
//!
//! Everything here is single-threaded and cooperative: listener callbacks
//! and hooks run synchronously, and a primitive mutation invalidates every
//! outstanding coordinate a consumer may hold (listeners re-anchor from the
//! `on_insert`/`on_erase` spans they receive).

use std::rc::Rc;
use std::time::SystemTime;

use bitflags::bitflags;
use tracing::trace;

pub use core_text::{Coord, Line, LineStore, TextIter};

mod hooks;
mod listener;
mod paths;
mod registry;
pub mod undo;

pub use hooks::{Hook, Hooks, NoopHooks, noop_hooks};
pub use listener::{ChangeListener, ListenerSet};
pub use registry::BufferRegistry;
pub use undo::{Modification, UndoGroup, UNDO_GROUP_LIMIT};

bitflags! {
    /// Buffer classification flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// Backed by a file; the name is a normalized path.
        const FILE = 1;
        /// File-backed but not yet written to disk.
        const NEW = 2;
        /// Reading from a fifo; content streams in.
        const FIFO = 4;
        /// Undo recording disabled.
        const NO_UNDO = 8;
    }
}

/// Tunables applied at construction time.
#[derive(Debug, Clone, Copy)]
pub struct BufferOptions {
    /// Committed undo groups retained; 0 = unlimited.
    pub undo_group_limit: usize,
    /// Shorten file-backed names in `display_name`.
    pub compact_display_paths: bool,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            undo_group_limit: UNDO_GROUP_LIMIT,
            compact_display_paths: true,
        }
    }
}

impl BufferOptions {
    pub fn from_config(config: &core_config::Config) -> Self {
        Self {
            undo_group_limit: config.file.undo.group_limit,
            compact_display_paths: config.file.display.compact_paths,
        }
    }
}

/// Arbitrary client data attached to a buffer. External engines (options,
/// highlighters, tools) park their per-buffer state here; the core never
/// looks inside.
pub type ValueMap = ahash::AHashMap<String, Box<dyn std::any::Any>>;

/// An in-memory text document with undo history and change listeners.
pub struct Buffer {
    name: String,
    flags: BufferFlags,
    store: LineStore,
    history: undo::History,
    /// Bumped on every primitive mutation (and on save-point moves).
    timestamp: u64,
    fs_timestamp: Option<SystemTime>,
    last_modification: Option<Coord>,
    listeners: ListenerSet,
    hooks: Rc<dyn Hooks>,
    options: BufferOptions,
    values: ValueMap,
}

impl Buffer {
    /// Create a buffer with default options and a no-op hook engine.
    pub fn new(name: impl Into<String>, flags: BufferFlags, lines: Vec<String>) -> Self {
        Self::with_hooks(name, flags, lines, noop_hooks())
    }

    pub fn with_hooks(
        name: impl Into<String>,
        flags: BufferFlags,
        lines: Vec<String>,
        hooks: Rc<dyn Hooks>,
    ) -> Self {
        Self::with_options(name, flags, lines, hooks, BufferOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        flags: BufferFlags,
        lines: Vec<String>,
        hooks: Rc<dyn Hooks>,
        options: BufferOptions,
    ) -> Self {
        let mut name = name.into();
        if flags.contains(BufferFlags::FILE) {
            name = paths::real_path(&name);
        }

        let buffer = Buffer {
            name,
            // recording stays off until the initial content is installed and
            // the creation hooks have run
            flags: flags | BufferFlags::NO_UNDO,
            store: LineStore::from_lines(lines, 0),
            history: undo::History::new(options.undo_group_limit),
            timestamp: 0,
            fs_timestamp: None,
            last_modification: None,
            listeners: ListenerSet::default(),
            hooks,
            options,
            values: ValueMap::default(),
        };

        if flags.contains(BufferFlags::FILE) {
            let hook = if flags.contains(BufferFlags::NEW) {
                Hook::BufNew
            } else {
                Hook::BufOpen
            };
            buffer.hooks.run_hook(hook, &buffer.name, &buffer);
        }
        buffer.hooks.run_hook(Hook::BufCreate, &buffer.name, &buffer);

        trace!(
            target: "buffer.registry",
            name = %buffer.name,
            lines = buffer.store.line_count(),
            "buffer_created"
        );

        let mut buffer = buffer;
        buffer.flags = flags;
        buffer
    }

    // ---------------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shortened name for UI surfaces; file-backed paths are compacted
    /// relative to the working directory or home.
    pub fn display_name(&self) -> String {
        if self.flags.contains(BufferFlags::FILE) && self.options.compact_display_paths {
            paths::compact_path(&self.name)
        } else {
            self.name.clone()
        }
    }

    /// Rename without a uniqueness check; [`BufferRegistry::rename`] is the
    /// public entry point.
    pub(crate) fn set_name_unchecked(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.name = if self.flags.contains(BufferFlags::FILE) {
            paths::real_path(&name)
        } else {
            name
        };
    }

    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut BufferFlags {
        &mut self.flags
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn fs_timestamp(&self) -> Option<SystemTime> {
        self.fs_timestamp
    }

    pub fn set_fs_timestamp(&mut self, timestamp: Option<SystemTime>) {
        self.fs_timestamp = timestamp;
    }

    /// Coordinate of the most recent primitive edit, if any.
    pub fn last_modification_coord(&self) -> Option<Coord> {
        self.last_modification
    }

    /// Client data attached to this buffer.
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueMap {
        &mut self.values
    }

    // ---------------------------------------------------------------------
    // Text access
    // ---------------------------------------------------------------------

    pub fn line_count(&self) -> usize {
        self.store.line_count()
    }

    pub fn byte_count(&self) -> usize {
        self.store.byte_count()
    }

    pub fn line_length(&self, line: usize) -> usize {
        self.store.line_length(line)
    }

    /// Line content, trailing newline included.
    pub fn line(&self, line: usize) -> &str {
        self.store.line(line)
    }

    pub fn line_timestamp(&self, line: usize) -> u64 {
        self.store.line_timestamp(line)
    }

    pub fn byte_at(&self, coord: Coord) -> u8 {
        self.store.byte_at(coord)
    }

    pub fn offset(&self, coord: Coord) -> usize {
        self.store.offset(coord)
    }

    pub fn distance(&self, begin: Coord, end: Coord) -> isize {
        self.store.distance(begin, end)
    }

    pub fn advance(&self, coord: Coord, count: isize) -> Coord {
        self.store.advance(coord, count)
    }

    pub fn next(&self, coord: Coord) -> Coord {
        self.store.next(coord)
    }

    pub fn prev(&self, coord: Coord) -> Coord {
        self.store.prev(coord)
    }

    pub fn char_next(&self, coord: Coord) -> Coord {
        self.store.char_next(coord)
    }

    pub fn char_prev(&self, coord: Coord) -> Coord {
        self.store.char_prev(coord)
    }

    pub fn offset_coord_by_chars(&self, coord: Coord, count: isize) -> Coord {
        self.store.offset_coord_by_chars(coord, count)
    }

    pub fn offset_coord_by_lines(&self, coord: Coord, count: isize) -> Coord {
        self.store.offset_coord_by_lines(coord, count)
    }

    pub fn end_coord(&self) -> Coord {
        self.store.end_coord()
    }

    pub fn back_coord(&self) -> Coord {
        self.store.back_coord()
    }

    pub fn is_valid(&self, coord: Coord) -> bool {
        self.store.is_valid(coord)
    }

    pub fn is_end(&self, coord: Coord) -> bool {
        self.store.is_end(coord)
    }

    pub fn clamp(&self, coord: Coord, avoid_eol: bool) -> Coord {
        self.store.clamp(coord, avoid_eol)
    }

    pub fn begin(&self) -> TextIter<'_> {
        self.store.begin()
    }

    pub fn end(&self) -> TextIter<'_> {
        self.store.end()
    }

    /// Iterator at `coord`, clamped to the nearest valid position.
    pub fn iter_at(&self, coord: Coord, avoid_eol: bool) -> TextIter<'_> {
        self.store.iter_at(coord, avoid_eol)
    }

    pub fn iter_at_line_begin(&self, line: usize) -> TextIter<'_> {
        self.store.iter_at_line_begin(line)
    }

    pub fn iter_at_line_end(&self, line: usize) -> TextIter<'_> {
        self.store.iter_at_line_end(line)
    }

    /// The text spanned by `[begin, end)`.
    pub fn string(&self, begin: Coord, end: Coord) -> String {
        self.store.string(begin, end)
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.store.string(Coord::origin(), self.store.end_coord())
    }

    pub fn check_invariant(&self) {
        self.store.check_invariant();
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Register a change listener. The buffer keeps a weak handle only;
    /// registration goes through `&self` because it does not change the
    /// observable text state.
    pub fn add_listener(&self, listener: &Rc<dyn ChangeListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Rc<dyn ChangeListener>) {
        self.listeners.remove(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ---------------------------------------------------------------------
    // Primitive editor
    // ---------------------------------------------------------------------

    fn do_insert(&mut self, pos: Coord, content: &str) {
        if content.is_empty() {
            return;
        }
        self.timestamp += 1;
        let (begin, end) = self.store.insert(pos, content, self.timestamp);
        self.last_modification = Some(begin);
        trace!(
            target: "buffer.edit",
            name = %self.name,
            line = pos.line,
            column = pos.column,
            bytes = content.len(),
            "insert"
        );
        for listener in self.listeners.snapshot() {
            listener.on_insert(self, begin, end);
        }
    }

    fn do_erase(&mut self, begin: Coord, end: Coord) {
        self.timestamp += 1;
        self.store.erase(begin, end, self.timestamp);
        self.last_modification = Some(begin);
        trace!(
            target: "buffer.edit",
            name = %self.name,
            line = begin.line,
            column = begin.column,
            "erase"
        );
        for listener in self.listeners.snapshot() {
            listener.on_erase(self, begin, end);
        }
    }

    // ---------------------------------------------------------------------
    // Recording façade
    // ---------------------------------------------------------------------

    /// Insert `content` at `pos`, recording it into the open undo group.
    ///
    /// Inserting at the end sentinel appends a newline when `content` lacks
    /// one, keeping the final line newline-terminated.
    pub fn insert(&mut self, pos: Coord, content: &str) {
        if content.is_empty() {
            return;
        }
        let pos = self.store.sanitize(pos);
        debug_assert!(self.store.is_valid(pos));

        let mut owned;
        let content = if self.store.is_end(pos) && !content.ends_with('\n') {
            owned = String::with_capacity(content.len() + 1);
            owned.push_str(content);
            owned.push('\n');
            owned.as_str()
        } else {
            content
        };

        if !self.flags.contains(BufferFlags::NO_UNDO) {
            self.history.record(Modification::Insert {
                at: pos,
                text: content.to_string(),
            });
        }
        self.do_insert(pos, content);
    }

    /// Erase `[begin, end)`, recording the removed bytes into the open undo
    /// group.
    ///
    /// An erase reaching the end sentinel steps back one byte unless it
    /// started at column 0 of an interior line: consuming the buffer's final
    /// newline would leave the last line unterminated, and the caller's
    /// intent is everything up to, not past, it.
    pub fn erase(&mut self, begin: Coord, end: Coord) {
        let begin = self.store.sanitize(begin);
        let mut end = self.store.sanitize(end);
        debug_assert!(self.store.is_valid(begin));
        debug_assert!(self.store.is_valid(end));

        if self.store.is_end(end) && (begin.column != 0 || begin.is_origin()) {
            end = self.store.prev(end);
        }
        if begin == end {
            return;
        }

        if !self.flags.contains(BufferFlags::NO_UNDO) {
            let text = self.store.string(begin, end);
            self.history.record(Modification::Erase { at: begin, text });
        }
        self.do_erase(begin, end);
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Close the open undo group: optimize it and append it to the history.
    /// A group that optimizes away leaves the history untouched.
    pub fn commit_undo_group(&mut self) {
        if self.flags.contains(BufferFlags::NO_UNDO) {
            self.history.clear_open_group();
            return;
        }
        self.history.commit();
    }

    /// Step one committed group back, replaying its inverse. Returns `false`
    /// at the beginning of history.
    pub fn undo(&mut self) -> bool {
        self.commit_undo_group();

        let Some(group) = self.history.start_undo() else {
            return false;
        };
        for modification in group.iter().rev() {
            self.apply_modification(&modification.inverse());
        }
        trace!(
            target: "buffer.undo",
            name = %self.name,
            cursor = self.history.cursor(),
            "undo_applied"
        );
        true
    }

    /// Step one committed group forward, replaying it. Returns `false` at
    /// the end of history.
    pub fn redo(&mut self) -> bool {
        let Some(group) = self.history.start_redo() else {
            return false;
        };
        for modification in &group {
            self.apply_modification(modification);
        }
        trace!(
            target: "buffer.undo",
            name = %self.name,
            cursor = self.history.cursor(),
            "redo_applied"
        );
        true
    }

    /// Replay primitive shared by undo and redo. Does not record.
    fn apply_modification(&mut self, modification: &Modification) {
        let mut coord = modification.at();
        // A modification recorded at the end of the buffer inverts to a
        // coordinate sitting past a line's final newline; normalize to the
        // head of the following line.
        if coord.line + 1 < self.store.line_count()
            && coord.column == self.store.line_length(coord.line)
        {
            coord = Coord::new(coord.line + 1, 0);
        }

        match modification {
            Modification::Insert { text, .. } => self.do_insert(coord, text),
            Modification::Erase { text, .. } => {
                let end = self.store.advance(coord, text.len() as isize);
                debug_assert_eq!(self.store.string(coord, end), *text);
                self.do_erase(coord, end);
            }
        }
    }

    /// Whether the text differs from the last saved state.
    pub fn is_modified(&self) -> bool {
        !self.history.is_at_save_point() || !self.history.open_group().is_empty()
    }

    /// Record that the buffer was saved in its current state.
    pub fn notify_saved(&mut self) {
        if !self.history.open_group().is_empty() {
            self.commit_undo_group();
        }
        self.flags.remove(BufferFlags::NEW);
        if self.history.mark_saved() {
            self.timestamp += 1;
        }
    }

    // ---------------------------------------------------------------------
    // Reload
    // ---------------------------------------------------------------------

    /// Replace the whole text with `lines`, committed as a single undo group
    /// so the pre-reload text is one `undo()` away.
    pub fn reload(&mut self, lines: Vec<String>, fs_timestamp: Option<SystemTime>) {
        self.commit_undo_group();

        self.erase(Coord::origin(), self.store.end_coord());

        let mut joined = String::new();
        for line in &lines {
            joined.push_str(line);
            if !line.ends_with('\n') {
                joined.push('\n');
            }
        }
        if !joined.is_empty() {
            self.insert(Coord::origin(), &joined);
            // drop the leftover line the wholesale erase left at the end
            if self.store.line_count() > 1 {
                let last = self.store.line_count() - 1;
                self.erase(Coord::new(last, 0), self.store.end_coord());
            }
        }

        self.commit_undo_group();
        self.fs_timestamp = fs_timestamp;
        trace!(
            target: "buffer.registry",
            name = %self.name,
            lines = self.store.line_count(),
            "buffer_reloaded"
        );
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.hooks.run_hook(Hook::BufClose, &self.name, self);
        debug_assert!(
            self.listeners.is_empty(),
            "buffer {:?} dropped with live change listeners",
            self.name
        );
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("lines", &self.store.line_count())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
