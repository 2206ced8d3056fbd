// ⏳ Versioned Item - identity + stack of value snapshots
//
// "Identity persists, values change"
//
// The baseline is the value the item had when the edit session started
// (or when it was created). Every edit step pushes a snapshot, so a step can
// be popped, a run of steps rewound, and any field compared to the baseline.
//
// Snapshots carry the version of the step that replaced them. A list-wide
// step at version N snapshots an item on its first edit within the step and
// every later edit joins that snapshot, so popping version N touches only
// the items edited during N.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{DataItem, Difference, EditState, FieldId, ItemId, ItemState};
use crate::error::{MoneyWiseError, Result};
use crate::validation::ErrorList;

/// Default bound on pushed snapshots per item
pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone)]
struct Snapshot<V> {
    values: V,
    deleted: bool,
    /// Step that produced these values
    version: usize,
    taken_at: DateTime<Utc>,
}

impl<V: PartialEq> Snapshot<V> {
    fn same_as(&self, other: &Snapshot<V>) -> bool {
        self.deleted == other.deleted && self.values == other.values
    }
}

// ============================================================================
// VERSIONED ITEM
// ============================================================================

#[derive(Debug, Clone)]
pub struct VersionedItem<V: DataItem> {
    id: ItemId,
    current: Snapshot<V>,
    baseline: V,
    committed: bool,
    /// Step the item was created in (0 = before any step)
    created_version: usize,
    history: Vec<Snapshot<V>>,
    max_history: usize,
    errors: ErrorList,
    validated: bool,
}

impl<V: DataItem> VersionedItem<V> {
    /// Create a brand new item (state New)
    pub fn new(values: V) -> Self {
        Self::build(ItemId::new(), values, false)
    }

    /// Wrap an item that already exists in the book (state Clean)
    pub fn committed(id: ItemId, values: V) -> Self {
        Self::build(id, values, true)
    }

    fn build(id: ItemId, values: V, committed: bool) -> Self {
        VersionedItem {
            id,
            baseline: values.clone(),
            current: Snapshot {
                values,
                deleted: false,
                version: 0,
                taken_at: Utc::now(),
            },
            committed,
            created_version: 0,
            history: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY,
            errors: ErrorList::new(),
            validated: false,
        }
    }

    /// Bound the number of snapshots kept (0 = unbounded)
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Mark the item as created inside step `version`
    pub(crate) fn created_at(mut self, version: usize) -> Self {
        self.created_version = version;
        self.current.version = version;
        self
    }

    /// True when popping step `version` must remove the item altogether
    pub(crate) fn created_in(&self, version: usize) -> bool {
        version > 0 && self.created_version == version
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history;
        self.condense_history();
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn values(&self) -> &V {
        &self.current.values
    }

    /// Values at the start of the edit session
    pub fn baseline(&self) -> &V {
        &self.baseline
    }

    pub fn is_deleted(&self) -> bool {
        self.current.deleted
    }

    pub fn last_changed(&self) -> DateTime<Utc> {
        self.current.taken_at
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Number of snapshots on the history stack
    pub fn version(&self) -> usize {
        self.history.len()
    }

    /// Open a new step on this item alone
    pub fn push_history(&mut self) {
        self.push_history_at(self.current.version + 1);
    }

    /// Snapshot the current values ahead of step `version`. An item already
    /// edited in that step keeps its first snapshot.
    pub(crate) fn push_history_at(&mut self, version: usize) {
        if self.current.version >= version {
            return;
        }
        self.history.push(self.current.clone());
        self.current.version = version;
        self.current.taken_at = Utc::now();
    }

    /// Restore the most recent snapshot. Returns false if there was none.
    pub fn pop_history(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Undo step `version` if this item was edited in it
    pub(crate) fn pop_history_at(&mut self, version: usize) -> bool {
        if self.current.version != version {
            return false;
        }
        if self.pop_history() {
            return true;
        }
        // the step's snapshot was condensed away
        self.current.version = version.saturating_sub(1);
        false
    }

    /// Drop the top snapshot if the edit after it changed nothing.
    /// Returns true when a real change is on the stack.
    pub fn check_for_history(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        self.check_for_history_at(self.current.version)
    }

    /// Close step `version` for this item: a snapshot that matches the
    /// current values is dropped, a real change is kept. Items created in
    /// the step always count as a change.
    pub(crate) fn check_for_history_at(&mut self, version: usize) -> bool {
        if self.created_in(version) {
            return true;
        }
        if self.current.version != version {
            return false;
        }
        match self.history.last() {
            Some(top) if top.same_as(&self.current) => {
                self.current.version = top.version;
                self.history.pop();
                false
            }
            Some(_) => {
                self.condense_history();
                true
            }
            None => false,
        }
    }

    /// Pop snapshots until only `version` remain
    pub fn rewind_to(&mut self, version: usize) {
        while self.history.len() > version {
            self.pop_history();
        }
    }

    /// Forget the history but keep the current values
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    fn condense_history(&mut self) {
        if self.max_history > 0 && self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
            debug!(item = %self.id, dropped = excess, "condensed item history");
        }
    }

    fn touch(&mut self) {
        self.validated = false;
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Apply an edit as one history step. Returns whether anything changed.
    pub fn update<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        self.update_at(self.current.version + 1, edit)
    }

    /// Apply an edit within step `version`, joining the step if the item
    /// was already edited in it
    pub(crate) fn update_at<F>(&mut self, version: usize, edit: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let opened = self.current.version < version;
        let before = self.current.values.clone();
        self.push_history_at(version);
        edit(&mut self.current.values);
        let changed = self.current.values != before;
        if opened {
            self.check_for_history_at(version);
        }
        if changed {
            self.touch();
        }
        changed
    }

    /// Mark deleted (a history step like any edit)
    pub fn delete(&mut self) -> bool {
        self.delete_at(self.current.version + 1)
    }

    pub(crate) fn delete_at(&mut self, version: usize) -> bool {
        if self.current.deleted {
            return false;
        }
        self.push_history_at(version);
        self.current.deleted = true;
        self.condense_history();
        self.touch();
        true
    }

    /// Undo a deletion (a history step like any edit)
    pub fn restore(&mut self) -> bool {
        self.restore_at(self.current.version + 1)
    }

    pub(crate) fn restore_at(&mut self, version: usize) -> bool {
        if !self.current.deleted {
            return false;
        }
        self.push_history_at(version);
        self.current.deleted = false;
        self.condense_history();
        self.touch();
        true
    }

    /// Accept the current values as the new baseline
    pub fn commit(&mut self) {
        self.baseline = self.current.values.clone();
        self.committed = true;
        self.created_version = 0;
        self.current.version = 0;
        self.history.clear();
        self.errors.clear();
        self.validated = false;
    }

    /// Throw away every edit since the baseline
    pub fn revert(&mut self) -> Result<()> {
        if !self.committed {
            return Err(MoneyWiseError::RevertNewItem);
        }
        self.current = Snapshot {
            values: self.baseline.clone(),
            deleted: false,
            version: 0,
            taken_at: Utc::now(),
        };
        self.history.clear();
        self.errors.clear();
        self.touch();
        Ok(())
    }

    // ========================================================================
    // CHANGE DETECTION
    // ========================================================================

    pub fn state(&self) -> ItemState {
        match (self.committed, self.current.deleted) {
            (false, false) => ItemState::New,
            (false, true) => ItemState::DelNew,
            (true, true) => ItemState::Deleted,
            (true, false) => {
                if self.current.values == self.baseline {
                    ItemState::Clean
                } else {
                    ItemState::Changed
                }
            }
        }
    }

    pub fn edit_state(&self) -> EditState {
        if !self.errors.is_empty() {
            EditState::Error
        } else if self.state() == ItemState::Clean {
            EditState::Clean
        } else if self.validated {
            EditState::Valid
        } else {
            EditState::Dirty
        }
    }

    /// Compare one field against the baseline
    pub fn field_changed(&self, field: FieldId) -> Difference {
        self.current.values.difference(&self.baseline, field)
    }

    /// Every field that differs from the baseline
    pub fn changed_fields(&self) -> Vec<FieldId> {
        self.current.values.differences(&self.baseline)
    }

    /// Fields changed by the most recent history step
    pub fn last_changes(&self) -> Vec<FieldId> {
        match self.history.last() {
            Some(top) => self.current.values.differences(&top.values),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // ERRORS
    // ========================================================================

    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn field_errors(&self, field: FieldId) -> Vec<&str> {
        self.errors.for_field(field)
    }

    pub fn add_error(&mut self, field: FieldId, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.validated = false;
    }

    pub(crate) fn set_validation(&mut self, errors: ErrorList) {
        self.errors = errors;
        self.validated = true;
    }
}

// ============================================================================
// TESTS
// ============================================================================
