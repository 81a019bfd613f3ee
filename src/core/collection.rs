//! Versioned source collection owned by a session

use crate::core::item::Item;
use std::collections::HashSet;
use uuid::Uuid;

/// The full, unfiltered set of items resident for a session
///
/// Items keep their insertion order; that order is the tie-breaker of every
/// sort. `version` increases on every mutation so memoized projections can
/// tell a stale input apart from a current one.
#[derive(Debug, Clone)]
pub struct SourceCollection<T: Item> {
    items: Vec<T>,
    version: u64,
}

impl<T: Item> Default for SourceCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            version: 0,
        }
    }
}

impl<T: Item> SourceCollection<T> {
    /// Create a collection from fetched items, dropping duplicate ids
    pub fn new(items: Vec<T>) -> Self {
        let mut collection = Self::default();
        collection.items = dedup(items);
        collection
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Position of an item in source order
    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Replace every item (refresh)
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = dedup(items);
        self.bump();
    }

    /// Append items not already present, returning how many were added
    pub fn append(&mut self, items: Vec<T>) -> usize {
        let mut seen: HashSet<Uuid> = self.items.iter().map(T::id).collect();
        let before = self.items.len();
        for item in items {
            if seen.insert(item.id()) {
                self.items.push(item);
            } else {
                tracing::warn!(
                    resource = T::resource_name(),
                    id = %item.id(),
                    "Dropping fetched item with duplicate id"
                );
            }
        }
        let added = self.items.len() - before;
        if added > 0 {
            self.bump();
        }
        added
    }

    /// Append a single new item; returns `false` if the id is taken
    pub fn insert(&mut self, item: T) -> bool {
        if self.position(item.id()).is_some() {
            return false;
        }
        self.items.push(item);
        self.bump();
        true
    }

    /// Merge a patch into the item in place, keeping its position
    ///
    /// Returns `false` and changes nothing if the id is unknown.
    pub fn edit(&mut self, id: Uuid, patch: &T::Patch) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id() == id) else {
            return false;
        };
        item.apply_patch(patch);
        debug_assert_eq!(item.id(), id, "patches must not change item identity");
        self.bump();
        true
    }

    /// Remove an item, keeping the relative order of the rest
    pub fn remove(&mut self, id: Uuid) -> Option<T> {
        let position = self.position(id)?;
        let removed = self.items.remove(position);
        self.bump();
        Some(removed)
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

fn dedup<T: Item>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.id());
            if !fresh {
                tracing::warn!(
                    resource = T::resource_name(),
                    id = %item.id(),
                    "Dropping fetched item with duplicate id"
                );
            }
            fresh
        })
        .collect()
}
