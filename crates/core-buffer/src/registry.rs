//! Buffer registry: the name-unique collection owning every live buffer.
//!
//! Modeled as a scoped service rather than a process-wide singleton so tests
//! (and embedders) can run isolated registries side by side. External code
//! holds names or short-lived references; the registry is the only owner.

use std::rc::Rc;

use anyhow::{Result, bail};
use tracing::trace;

use crate::hooks::{Hooks, noop_hooks};
use crate::paths;
use crate::{Buffer, BufferFlags, BufferOptions};

/// Name-unique owning map of buffers.
pub struct BufferRegistry {
    buffers: ahash::AHashMap<String, Buffer>,
    hooks: Rc<dyn Hooks>,
    options: BufferOptions,
}

impl Default for BufferRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::with_hooks(noop_hooks())
    }

    pub fn with_hooks(hooks: Rc<dyn Hooks>) -> Self {
        Self {
            buffers: ahash::AHashMap::new(),
            hooks,
            options: BufferOptions::default(),
        }
    }

    /// Options applied to buffers created from now on.
    pub fn set_options(&mut self, options: BufferOptions) {
        self.options = options;
    }

    /// Create and register a buffer. Fails when a buffer already holds the
    /// (path-normalized) name.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        flags: BufferFlags,
        lines: Vec<String>,
    ) -> Result<&mut Buffer> {
        let name = name.into();
        let key = if flags.contains(BufferFlags::FILE) {
            paths::real_path(&name)
        } else {
            name.clone()
        };
        if self.buffers.contains_key(&key) {
            bail!("buffer name already in use: {key}");
        }

        let buffer = Buffer::with_options(name, flags, lines, self.hooks.clone(), self.options);
        debug_assert_eq!(buffer.name(), key);
        trace!(target: "buffer.registry", name = %key, total = self.buffers.len() + 1, "buffer_registered");
        Ok(self.buffers.entry(key).or_insert(buffer))
    }

    pub fn get(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Buffer> {
        self.buffers.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// Drop the named buffer, firing its `BufClose` hook. Returns whether it
    /// existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.buffers.remove(name).is_some();
        if removed {
            trace!(target: "buffer.registry", name, total = self.buffers.len(), "buffer_unregistered");
        }
        removed
    }

    /// Rename a buffer. Succeeds iff `old` exists and no other buffer holds
    /// the (path-normalized) new name.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> bool {
        let new = new.into();
        let Some(buffer) = self.buffers.get(old) else {
            return false;
        };
        let key = if buffer.flags().contains(BufferFlags::FILE) {
            paths::real_path(&new)
        } else {
            new.clone()
        };
        if key == old {
            return true;
        }
        if self.buffers.contains_key(&key) {
            return false;
        }

        let mut buffer = self.buffers.remove(old).expect("checked above");
        buffer.set_name_unchecked(new);
        debug_assert_eq!(buffer.name(), key);
        self.buffers.insert(key, buffer);
        true
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.values()
    }

    /// Buffer names starting with `prefix`, sorted, for completion.
    pub fn complete_name(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .buffers
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Coord;

    #[test]
    fn create_and_lookup() {
        let mut registry = BufferRegistry::new();
        registry
            .create("*scratch*", BufferFlags::empty(), Vec::new())
            .unwrap();
        assert!(registry.contains("*scratch*"));
        assert_eq!(registry.len(), 1);
        registry
            .get_mut("*scratch*")
            .unwrap()
            .insert(Coord::origin(), "hi");
        assert_eq!(registry.get("*scratch*").unwrap().text(), "hi\n");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = BufferRegistry::new();
        registry
            .create("*scratch*", BufferFlags::empty(), Vec::new())
            .unwrap();
        let err = registry
            .create("*scratch*", BufferFlags::empty(), Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn file_names_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x\n").unwrap();
        let mut registry = BufferRegistry::new();
        let name = registry
            .create(file.to_string_lossy(), BufferFlags::FILE, vec!["x\n".into()])
            .unwrap()
            .name()
            .to_string();
        assert_eq!(name, file.canonicalize().unwrap().to_string_lossy());
        assert!(registry.contains(&name));
    }

    #[test]
    fn rename_enforces_uniqueness() {
        let mut registry = BufferRegistry::new();
        registry.create("a", BufferFlags::empty(), Vec::new()).unwrap();
        registry.create("b", BufferFlags::empty(), Vec::new()).unwrap();

        assert!(!registry.rename("a", "b"));
        assert!(registry.rename("a", "a")); // renaming to itself succeeds
        assert!(registry.rename("a", "c"));
        assert!(registry.contains("c"));
        assert!(!registry.contains("a"));
        assert!(!registry.rename("missing", "d"));
    }

    #[test]
    fn remove_drops_the_buffer() {
        let mut registry = BufferRegistry::new();
        registry
            .create("gone", BufferFlags::empty(), Vec::new())
            .unwrap();
        assert!(registry.remove("gone"));
        assert!(!registry.remove("gone"));
        assert!(registry.is_empty());
    }

    #[test]
    fn completion_is_sorted_prefix_match() {
        let mut registry = BufferRegistry::new();
        for name in ["beta", "alpha", "alp", "other"] {
            registry.create(name, BufferFlags::empty(), Vec::new()).unwrap();
        }
        assert_eq!(registry.complete_name("alp"), vec!["alp", "alpha"]);
        assert_eq!(registry.complete_name(""), vec!["alp", "alpha", "beta", "other"]);
        assert!(registry.complete_name("zzz").is_empty());
    }
}
