// ⚠️ Error Types - library failures (not validation findings)
//
// Validation problems are DATA (see validation.rs), collected per item and
// reported together. The errors here stop an operation outright.

use thiserror::Error;

use crate::item::ItemId;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, MoneyWiseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoneyWiseError {
    #[error("Invalid currency code '{0}'")]
    InvalidCurrency(String),

    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Item {0} is deleted")]
    ItemDeleted(ItemId),

    #[error("Info class {class} expects {expected} value")]
    InfoTypeMismatch { class: &'static str, expected: &'static str },

    #[error("Unknown {kind} '{value}'")]
    UnknownName { kind: &'static str, value: String },

    #[error("Cannot hold security {security} in portfolio {portfolio}: {reason}")]
    InvalidHolding {
        portfolio: ItemId,
        security: ItemId,
        reason: String,
    },

    #[error("Amount out of range: {0}")]
    AmountOverflow(String),

    #[error("Cannot revert a new item")]
    RevertNewItem,

    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    #[error("Document error: {0}")]
    Document(String),
}

impl From<serde_json::Error> for MoneyWiseError {
    fn from(err: serde_json::Error) -> Self {
        MoneyWiseError::Document(err.to_string())
    }
}

impl From<csv::Error> for MoneyWiseError {
    fn from(err: csv::Error) -> Self {
        MoneyWiseError::Document(err.to_string())
    }
}

impl From<std::io::Error> for MoneyWiseError {
    fn from(err: std::io::Error) -> Self {
        MoneyWiseError::Document(err.to_string())
    }
}
