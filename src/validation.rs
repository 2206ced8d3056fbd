// 📐 Validation Layer - field errors and edit-set reports
//
// Items collect FieldErrors while validating. The edit set gathers them into
// a ValidationReport with one ValidationError per problem.

use serde::Serialize;
use std::fmt;

use crate::item::{FieldId, ItemId, ItemKind};

// ============================================================================
// FIELD ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: FieldId,
    pub message: String,
}

/// Errors attached to a single item, keyed by field
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorList {
    entries: Vec<FieldError>,
}

impl ErrorList {
    pub fn new() -> Self {
        ErrorList::default()
    }

    pub fn add(&mut self, field: FieldId, message: impl Into<String>) {
        self.entries.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.entries.extend(other.entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }

    pub fn has_field(&self, field: FieldId) -> bool {
        self.entries.iter().any(|e| e.field == field)
    }

    pub fn for_field(&self, field: FieldId) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub kind: ItemKind,
    pub item: ItemId,
    pub label: String,
    pub field: FieldId,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {}] {}: {}",
            self.kind, self.label, self.field, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// VALIDATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub items_checked: usize,
    pub items_with_errors: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_for(&self, item: ItemId) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.item == item).collect()
    }

    pub fn errors_of_kind(&self, kind: ItemKind) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.kind == kind).collect()
    }

    /// Record the errors of one item
    pub fn record(&mut self, kind: ItemKind, item: ItemId, label: &str, errors: &ErrorList) {
        self.items_checked += 1;
        if errors.is_empty() {
            return;
        }
        self.items_with_errors += 1;
        for e in errors.iter() {
            self.errors.push(ValidationError {
                kind,
                item,
                label: label.to_string(),
                field: e.field,
                message: e.message.clone(),
            });
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} items checked: {} with errors, {} errors total",
            self.items_checked,
            self.items_with_errors,
            self.errors.len()
        )
    }
}
