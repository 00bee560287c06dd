//! Scoped key/metadata store with ordered fallback parents.
//!
//! A container is populated while a composition unit is being defined and
//! then read many times. On a local miss it consults its parents depth-first
//! in the order they were linked.

use super::metadata::{CompositeKey, Metadata};
use parking_lot::RwLock;
use std::sync::Arc;

/// Reason a parent link was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRefusal {
    /// The parent already (transitively) falls back to this container.
    Cycle,
}

/// A mapping from [`CompositeKey`] to stored values plus an ordered,
/// deduplicated list of parent containers.
///
/// Values are stored behind `Arc` so lookups can hand them out without
/// holding the container lock while user callables run.
///
/// # Example
///
/// ```rust
/// use statewise::core::{Container, Metadata};
/// use std::sync::Arc;
///
/// let base = Arc::new(Container::new());
/// base.register("greeting", Metadata::new(), "hello");
///
/// let child = Container::with_parents([Arc::clone(&base)]);
/// assert_eq!(child.lookup("greeting", &Metadata::new()).as_deref(), Some(&"hello"));
///
/// child.register("greeting", Metadata::new(), "hi");
/// assert_eq!(child.lookup("greeting", &Metadata::new()).as_deref(), Some(&"hi"));
/// ```
pub struct Container<V> {
    entries: RwLock<Vec<(CompositeKey, Arc<V>)>>,
    parents: RwLock<Vec<Arc<Container<V>>>>,
}

impl<V> Container<V> {
    /// Create an empty container with no parents.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            parents: RwLock::new(Vec::new()),
        }
    }

    /// Create an empty container falling back to `parents`, in order.
    ///
    /// Repeated parents are linked once. A fresh container cannot be reached
    /// from any existing one, so no cycle check is needed here.
    pub fn with_parents(parents: impl IntoIterator<Item = Arc<Container<V>>>) -> Self {
        let container = Self::new();
        {
            let mut linked = container.parents.write();
            for parent in parents {
                if !linked.iter().any(|p| Arc::ptr_eq(p, &parent)) {
                    linked.push(parent);
                }
            }
        }
        container
    }

    /// Insert or overwrite the entry at `(name, metadata)` in this container only.
    pub fn register(&self, name: impl Into<String>, metadata: Metadata, value: V) {
        let key = CompositeKey::new(name, metadata);
        let value = Arc::new(value);
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }

    /// Append `parent` to the fallback chain.
    ///
    /// Linking an already-present parent is a no-op. Links that would make
    /// the chain cyclic are refused.
    pub fn link(&self, parent: Arc<Container<V>>) -> Result<(), LinkRefusal> {
        if !self.can_link(&parent) {
            return Err(LinkRefusal::Cycle);
        }
        let mut parents = self.parents.write();
        if !parents.iter().any(|p| Arc::ptr_eq(p, &parent)) {
            parents.push(parent);
        }
        Ok(())
    }

    /// Whether linking `parent` would keep the fallback chain acyclic.
    pub fn can_link(&self, parent: &Arc<Container<V>>) -> bool {
        !std::ptr::eq(Arc::as_ptr(parent), self) && !parent.reaches(self)
    }

    /// Linked parents in fallback order.
    pub fn parents(&self) -> Vec<Arc<Container<V>>> {
        self.parents.read().clone()
    }

    /// First local entry matching `name` and `filter`, else the first hit
    /// among the parents in link order.
    ///
    /// Resolution is per name: a local entry for `name` under a different
    /// metadata family does not stop the search from reaching ancestors.
    pub fn lookup(&self, name: &str, filter: &Metadata) -> Option<Arc<V>> {
        let local = self
            .entries
            .read()
            .iter()
            .find(|(key, _)| key.matches(name, filter))
            .map(|(_, value)| Arc::clone(value));
        if local.is_some() {
            return local;
        }
        self.parents
            .read()
            .iter()
            .find_map(|parent| parent.lookup(name, filter))
    }

    /// Keys matching `name` and `filter` at the nearest level that has any.
    ///
    /// If this container holds at least one match, only local keys are
    /// returned. Otherwise each parent is searched the same way and the
    /// results are concatenated in link order.
    pub fn matching_keys(&self, name: &str, filter: &Metadata) -> Vec<CompositeKey> {
        self.matching_entries(name, filter)
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    /// Same traversal as [`matching_keys`](Self::matching_keys), keeping the values.
    pub fn matching_entries(&self, name: &str, filter: &Metadata) -> Vec<(CompositeKey, Arc<V>)> {
        let local: Vec<_> = self
            .entries
            .read()
            .iter()
            .filter(|(key, _)| key.matches(name, filter))
            .map(|(key, value)| (key.clone(), Arc::clone(value)))
            .collect();
        if !local.is_empty() {
            return local;
        }
        self.parents
            .read()
            .iter()
            .flat_map(|parent| parent.matching_entries(name, filter))
            .collect()
    }

    /// Every local key followed by every parent's keys, with no shadowing.
    ///
    /// Keys declared at several levels appear once per level.
    pub fn all_keys(&self) -> Vec<CompositeKey> {
        let mut keys: Vec<CompositeKey> = self
            .entries
            .read()
            .iter()
            .map(|(key, _)| key.clone())
            .collect();
        for parent in self.parents.read().iter() {
            keys.extend(parent.all_keys());
        }
        keys
    }

    /// Names of [`all_keys`](Self::all_keys), deduplicated in first-seen order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for key in self.all_keys() {
            if !names.contains(&key.name) {
                names.push(key.name);
            }
        }
        names
    }

    /// Exact key lookup, local first, then parents in link order.
    pub fn get_by_key(&self, key: &CompositeKey) -> Option<Arc<V>> {
        let local = self
            .entries
            .read()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| Arc::clone(value));
        if local.is_some() {
            return local;
        }
        self.parents
            .read()
            .iter()
            .find_map(|parent| parent.get_by_key(key))
    }

    /// Number of entries registered directly in this container.
    pub fn local_len(&self) -> usize {
        self.entries.read().len()
    }

    fn reaches(&self, target: *const Container<V>) -> bool {
        self.parents
            .read()
            .iter()
            .any(|parent| std::ptr::eq(Arc::as_ptr(parent), target) || parent.reaches(target))
    }
}

impl<V> Default for Container<V> {
    fn default() -> Self {
        Self::new()
    }
}
