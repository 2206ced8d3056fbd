// 🧱 Data Items - identity, fields, differences, states
//
// "The ItemId is IDENTITY (never changes), the values are snapshots."
//
// Every financial entity (payee, account, security, transaction) is a plain
// value struct implementing DataItem. VersionedItem wraps it with history,
// change detection and validation errors; DataList keeps the items of one kind.

pub mod list;
pub mod versioned;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::editset::EditSet;
use crate::validation::ErrorList;

pub use list::DataList;
pub use versioned::VersionedItem;

// ============================================================================
// ITEM IDENTITY
// ============================================================================

/// Stable identity (UUID) - NEVER changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(uuid::Uuid);

impl ItemId {
    pub fn new() -> Self {
        ItemId(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ITEM KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Payee,
    Deposit,
    Cash,
    Loan,
    Portfolio,
    Security,
    Transaction,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Payee => "Payee",
            ItemKind::Deposit => "Deposit",
            ItemKind::Cash => "Cash",
            ItemKind::Loan => "Loan",
            ItemKind::Portfolio => "Portfolio",
            ItemKind::Security => "Security",
            ItemKind::Transaction => "Transaction",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FIELDS
// ============================================================================

/// Names one field of an item. Info-set entries are fields too, keyed by
/// their class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FieldId {
    Name,
    Desc,
    Category,
    Parent,
    Currency,
    Closed,
    Date,
    Account,
    Partner,
    Direction,
    Amount,
    Reconciled,
    Info(&'static str),
}

impl FieldId {
    pub fn name(&self) -> &'static str {
        match self {
            FieldId::Name => "Name",
            FieldId::Desc => "Description",
            FieldId::Category => "Category",
            FieldId::Parent => "Parent",
            FieldId::Currency => "Currency",
            FieldId::Closed => "Closed",
            FieldId::Date => "Date",
            FieldId::Account => "Account",
            FieldId::Partner => "Partner",
            FieldId::Direction => "Direction",
            FieldId::Amount => "Amount",
            FieldId::Reconciled => "Reconciled",
            FieldId::Info(class) => class,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of comparing one field across two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difference {
    Identical,
    Value,
}

impl Difference {
    pub fn of<T: PartialEq + ?Sized>(a: &T, b: &T) -> Self {
        if a == b {
            Difference::Identical
        } else {
            Difference::Value
        }
    }

    pub fn is_different(&self) -> bool {
        *self == Difference::Value
    }
}

/// Push `field` onto `out` when the two values differ
pub fn diff_field<T: PartialEq + ?Sized>(out: &mut Vec<FieldId>, field: FieldId, a: &T, b: &T) {
    if Difference::of(a, b).is_different() {
        out.push(field);
    }
}

// ============================================================================
// STATES
// ============================================================================

/// Lifecycle of an item within an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    /// Created in this session
    New,
    /// Committed and unchanged
    Clean,
    /// Committed and edited
    Changed,
    /// Committed and marked deleted
    Deleted,
    /// Created in this session then deleted
    DelNew,
}

impl ItemState {
    pub fn is_deleted(&self) -> bool {
        matches!(self, ItemState::Deleted | ItemState::DelNew)
    }
}

/// Validation status of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditState {
    Clean,
    Dirty,
    Valid,
    Error,
}

// ============================================================================
// DATA ITEM
// ============================================================================

/// A value snapshot of one financial entity.
pub trait DataItem: Clone + PartialEq + fmt::Debug {
    const KIND: ItemKind;

    /// Fields whose values differ between `self` and `other`
    fn differences(&self, other: &Self) -> Vec<FieldId>;

    /// Validate this item in the context of the whole edit set
    fn validate(&self, id: ItemId, set: &EditSet, errors: &mut ErrorList);

    /// Name used for uniqueness checks, if the kind is named
    fn name(&self) -> Option<&str> {
        None
    }

    /// Category name when the category admits only one item
    fn singular_class(&self) -> Option<&'static str> {
        None
    }

    fn is_closed(&self) -> bool {
        false
    }

    /// Short label used in reports
    fn label(&self) -> String {
        self.name().unwrap_or("(unnamed)").to_string()
    }

    fn difference(&self, other: &Self, field: FieldId) -> Difference {
        if self.differences(other).contains(&field) {
            Difference::Value
        } else {
            Difference::Identical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ids_are_unique() {
        let a = ItemId::new();
        let b = ItemId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_difference_of() {
        assert_eq!(Difference::of("a", "a"), Difference::Identical);
        assert_eq!(Difference::of(&1, &2), Difference::Value);
    }

    #[test]
    fn test_diff_field_collects_changes() {
        let mut out = Vec::new();
        diff_field(&mut out, FieldId::Name, "Old", "New");
        diff_field(&mut out, FieldId::Closed, &false, &false);
        assert_eq!(out, vec![FieldId::Name]);
    }

    #[test]
    fn test_info_field_name() {
        assert_eq!(FieldId::Info("Notes").name(), "Notes");
        assert_eq!(FieldId::Desc.to_string(), "Description");
    }
}
