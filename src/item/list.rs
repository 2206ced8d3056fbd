// 📚 Data List - all items of one kind
//
// Keeps items in insertion order with an id index. Deleted items stay in the
// list (so the deletion can be popped) until the list is committed.
//
// The list version counts open history steps. Edits made through the list
// join the current step; edits before the first step are not undoable and
// only show against the baseline.

use std::collections::HashMap;

use tracing::debug;

use super::versioned::DEFAULT_MAX_HISTORY;
use super::{DataItem, FieldId, ItemId, VersionedItem};
use crate::error::{MoneyWiseError, Result};
use crate::validation::ErrorList;

#[derive(Debug, Clone)]
pub struct DataList<V: DataItem> {
    items: Vec<VersionedItem<V>>,
    index: HashMap<ItemId, usize>,
    max_history: usize,
    version: usize,
}

impl<V: DataItem> DataList<V> {
    pub fn new() -> Self {
        DataList {
            items: Vec::new(),
            index: HashMap::new(),
            max_history: DEFAULT_MAX_HISTORY,
            version: 0,
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.set_max_history(max_history);
        self
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history;
        for item in &mut self.items {
            item.set_max_history(max_history);
        }
    }

    // ========================================================================
    // INSERTION
    // ========================================================================

    /// Add a new item (state New) and return its id
    pub fn add(&mut self, values: V) -> ItemId {
        self.push(VersionedItem::new(values))
    }

    /// Add an item that already exists in the book (state Clean)
    pub fn insert_committed(&mut self, id: ItemId, values: V) -> ItemId {
        self.push(VersionedItem::committed(id, values))
    }

    fn push(&mut self, item: VersionedItem<V>) -> ItemId {
        let item = item
            .with_max_history(self.max_history)
            .created_at(self.version);
        let id = item.id();
        self.index.insert(id, self.items.len());
        self.items.push(item);
        debug!(kind = %V::KIND, item = %id, "item added");
        id
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Get an item by id (deleted items included)
    pub fn get(&self, id: ItemId) -> Option<&VersionedItem<V>> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    /// Direct access to an item. Edits made on it keep their own history
    /// and are not part of the list's steps.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut VersionedItem<V>> {
        match self.index.get(&id) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    /// Get a live (not deleted) item, or explain why not
    pub fn live(&self, id: ItemId) -> Result<&VersionedItem<V>> {
        let item = self.get(id).ok_or(MoneyWiseError::ItemNotFound(id))?;
        if item.is_deleted() {
            return Err(MoneyWiseError::ItemDeleted(id));
        }
        Ok(item)
    }

    /// Find a live item by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&VersionedItem<V>> {
        let lower = name.to_lowercase();
        self.iter().find(|item| {
            item.values()
                .name()
                .map_or(false, |n| n.to_lowercase() == lower)
        })
    }

    /// Live items
    pub fn iter(&self) -> impl Iterator<Item = &VersionedItem<V>> {
        self.items.iter().filter(|item| !item.is_deleted())
    }

    /// Every item, deleted ones included
    pub fn iter_all(&self) -> impl Iterator<Item = &VersionedItem<V>> {
        self.items.iter()
    }

    pub fn iter_all_mut(&mut self) -> impl Iterator<Item = &mut VersionedItem<V>> {
        self.items.iter_mut()
    }

    /// Count of live items
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Apply an edit to one item within the current step
    pub fn update<F>(&mut self, id: ItemId, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut V),
    {
        let version = self.version;
        let item = self.get_mut(id).ok_or(MoneyWiseError::ItemNotFound(id))?;
        Ok(item.update_at(version, edit))
    }

    pub fn delete(&mut self, id: ItemId) -> Result<bool> {
        let version = self.version;
        let item = self.get_mut(id).ok_or(MoneyWiseError::ItemNotFound(id))?;
        Ok(item.delete_at(version))
    }

    pub fn restore(&mut self, id: ItemId) -> Result<bool> {
        let version = self.version;
        let item = self.get_mut(id).ok_or(MoneyWiseError::ItemNotFound(id))?;
        Ok(item.restore_at(version))
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Number of open history steps
    pub fn version(&self) -> usize {
        self.version
    }

    /// Open a new step
    pub fn push_history(&mut self) {
        self.version += 1;
    }

    /// Undo the latest step: items edited in it get their snapshot back,
    /// items created in it are removed.
    pub fn pop_history(&mut self) {
        if self.version == 0 {
            return;
        }
        let version = self.version;

        let before = self.items.len();
        self.items.retain(|item| !item.created_in(version));
        if self.items.len() != before {
            self.reindex();
        }

        let mut restored = 0;
        for item in &mut self.items {
            if item.pop_history_at(version) {
                restored += 1;
            }
        }
        self.version -= 1;
        debug!(
            kind = %V::KIND,
            version,
            removed = before - self.items.len(),
            restored,
            "step popped"
        );
    }

    /// Close the latest step. A step that changed nothing is dropped.
    /// Returns true if any item really changed.
    pub fn check_for_history(&mut self) -> bool {
        let changed = self.settle_step();
        if !changed {
            self.drop_step();
        }
        changed
    }

    /// Drop the no-op snapshots of the latest step, keeping the step open
    pub(crate) fn settle_step(&mut self) -> bool {
        if self.version == 0 {
            return false;
        }
        let version = self.version;
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.check_for_history_at(version);
        }
        changed
    }

    /// Forget the latest step; only valid once it holds no changes
    pub(crate) fn drop_step(&mut self) {
        self.version = self.version.saturating_sub(1);
    }

    /// Drop deleted items and accept the rest as the new baseline
    pub fn commit(&mut self) {
        let before = self.items.len();
        self.items.retain(|item| !item.is_deleted());
        for item in &mut self.items {
            item.commit();
        }
        self.version = 0;
        self.reindex();
        debug!(
            kind = %V::KIND,
            removed = before - self.items.len(),
            "list committed"
        );
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id(), i))
            .collect();
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Store item-level results then run the list-level checks
    /// (name uniqueness, singular categories).
    pub fn apply_validation(&mut self, mut results: HashMap<ItemId, ErrorList>) {
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        let mut singular_counts: HashMap<&'static str, usize> = HashMap::new();

        for item in self.iter() {
            if let Some(name) = item.values().name() {
                *name_counts.entry(name.to_lowercase()).or_insert(0) += 1;
            }
            if let Some(class) = item.values().singular_class() {
                *singular_counts.entry(class).or_insert(0) += 1;
            }
        }

        for item in &mut self.items {
            let mut errors = results.remove(&item.id()).unwrap_or_default();
            if !item.is_deleted() {
                if let Some(name) = item.values().name() {
                    if name_counts.get(&name.to_lowercase()).copied().unwrap_or(0) > 1 {
                        errors.add(FieldId::Name, format!("Duplicate name '{}'", name));
                    }
                }
                if let Some(class) = item.values().singular_class() {
                    if singular_counts.get(class).copied().unwrap_or(0) > 1 {
                        errors.add(
                            FieldId::Category,
                            format!("Only one {} {} is allowed", class, V::KIND),
                        );
                    }
                }
            }
            item.set_validation(errors);
        }
    }
}

impl<V: DataItem> Default for DataList<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
