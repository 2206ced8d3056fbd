// MoneyWise Core - Library
// Versioned data items, info sets and validation for a personal-finance book.

pub mod config;
pub mod document;
pub mod editset;
pub mod entities;
pub mod error;
pub mod holdings;
pub mod infoset;
pub mod item;
pub mod money;
pub mod tax;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use document::{
    import_register, import_register_file, resolve_asset, BookDocument, DocumentIssue,
    ImportSummary, LoadedBook,
};
pub use editset::{AssetView, EditSet};
pub use entities::{
    AccountInfoClass, AssetClass, AssetRef, Cash, CashCategory, Deposit, DepositCategory,
    Direction, Loan, LoanCategory, Payee, PayeeType, Portfolio, PortfolioType, Security,
    SecurityType, Transaction, TransactionCategory, TransactionInfoClass,
};
pub use error::{MoneyWiseError, Result};
pub use holdings::{SecurityHolding, SecurityHoldingMap};
pub use infoset::{FieldRequired, InfoClass, InfoDataType, InfoOwner, InfoSet, InfoValue};
pub use item::{
    DataItem, DataList, Difference, EditState, FieldId, ItemId, ItemKind, ItemState,
    VersionedItem,
};
pub use money::{Currency, Money, Price, Ratio, Units};
pub use tax::{TaxBucket, TaxYear, TaxYearStart, TaxYearSummary};
pub use validation::{ErrorList, FieldError, ValidationError, ValidationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
