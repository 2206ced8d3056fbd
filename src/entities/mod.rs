// Entity Models - payees, accounts, securities, transactions
//
// Each entity is a plain value struct (the VALUES); identity and history are
// added by VersionedItem. Every account-like entity carries an InfoSet of
// AccountInfoClass whose membership its category decides.

pub mod cash;
pub mod deposit;
pub mod loan;
pub mod payee;
pub mod portfolio;
pub mod security;
pub mod transaction;

pub use cash::{Cash, CashCategory};
pub use deposit::{Deposit, DepositCategory};
pub use loan::{Loan, LoanCategory};
pub use payee::{Payee, PayeeType};
pub use portfolio::{Portfolio, PortfolioType};
pub use security::{Security, SecurityType};
pub use transaction::{
    AssetClass, AssetRef, Direction, Transaction, TransactionCategory, TransactionInfoClass,
};

use crate::editset::EditSet;
use crate::infoset::{InfoClass, InfoDataType, InfoValue};
use crate::item::{FieldId, ItemId};
use crate::money::Currency;
use crate::validation::ErrorList;

pub const NAME_LEN: usize = 30;
pub const DESC_LEN: usize = 50;

// ============================================================================
// ACCOUNT INFO CLASS
// ============================================================================

/// Info classes shared by payees, accounts and securities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountInfoClass {
    Maturity,
    OpeningBalance,
    AutoExpense,
    AutoPayee,
    Symbol,
    Region,
    UnderlyingStock,
    OptionPrice,
    GrantDate,
    SortCode,
    Account,
    Reference,
    WebSite,
    CustomerNo,
    UserId,
    Password,
    Notes,
}

impl AccountInfoClass {
    /// Online-banking style details
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            AccountInfoClass::SortCode
                | AccountInfoClass::Account
                | AccountInfoClass::Reference
                | AccountInfoClass::WebSite
                | AccountInfoClass::CustomerNo
                | AccountInfoClass::UserId
                | AccountInfoClass::Password
        )
    }
}

impl InfoClass for AccountInfoClass {
    fn all() -> &'static [Self] {
        &[
            AccountInfoClass::Maturity,
            AccountInfoClass::OpeningBalance,
            AccountInfoClass::AutoExpense,
            AccountInfoClass::AutoPayee,
            AccountInfoClass::Symbol,
            AccountInfoClass::Region,
            AccountInfoClass::UnderlyingStock,
            AccountInfoClass::OptionPrice,
            AccountInfoClass::GrantDate,
            AccountInfoClass::SortCode,
            AccountInfoClass::Account,
            AccountInfoClass::Reference,
            AccountInfoClass::WebSite,
            AccountInfoClass::CustomerNo,
            AccountInfoClass::UserId,
            AccountInfoClass::Password,
            AccountInfoClass::Notes,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            AccountInfoClass::Maturity => "Maturity",
            AccountInfoClass::OpeningBalance => "OpeningBalance",
            AccountInfoClass::AutoExpense => "AutoExpense",
            AccountInfoClass::AutoPayee => "AutoPayee",
            AccountInfoClass::Symbol => "Symbol",
            AccountInfoClass::Region => "Region",
            AccountInfoClass::UnderlyingStock => "UnderlyingStock",
            AccountInfoClass::OptionPrice => "OptionPrice",
            AccountInfoClass::GrantDate => "GrantDate",
            AccountInfoClass::SortCode => "SortCode",
            AccountInfoClass::Account => "Account",
            AccountInfoClass::Reference => "Reference",
            AccountInfoClass::WebSite => "WebSite",
            AccountInfoClass::CustomerNo => "CustomerNo",
            AccountInfoClass::UserId => "UserId",
            AccountInfoClass::Password => "Password",
            AccountInfoClass::Notes => "Notes",
        }
    }

    fn data_type(&self) -> InfoDataType {
        match self {
            AccountInfoClass::Maturity | AccountInfoClass::GrantDate => InfoDataType::Date,
            AccountInfoClass::OpeningBalance => InfoDataType::Money,
            AccountInfoClass::AutoPayee | AccountInfoClass::UnderlyingStock => InfoDataType::Link,
            AccountInfoClass::OptionPrice => InfoDataType::Price,
            _ => InfoDataType::Text,
        }
    }

    fn max_length(&self) -> Option<usize> {
        match self {
            AccountInfoClass::Notes => Some(500),
            AccountInfoClass::WebSite => Some(50),
            AccountInfoClass::AutoExpense | AccountInfoClass::Symbol | AccountInfoClass::Region => {
                Some(30)
            }
            c if c.is_credential() => Some(20),
            _ => None,
        }
    }
}

// ============================================================================
// SHARED VALIDATION
// ============================================================================

pub(crate) fn validate_name(name: &str, errors: &mut ErrorList) {
    if name.trim().is_empty() {
        errors.add(FieldId::Name, "Required field is empty");
    } else if name.chars().count() > NAME_LEN {
        errors.add(FieldId::Name, format!("Exceeds maximum length of {}", NAME_LEN));
    }
}

pub(crate) fn validate_desc(desc: &Option<String>, errors: &mut ErrorList) {
    if let Some(desc) = desc {
        if desc.chars().count() > DESC_LEN {
            errors.add(FieldId::Desc, format!("Exceeds maximum length of {}", DESC_LEN));
        }
    }
}

/// Parent must be a live payee of an allowed type; a closed parent may only
/// own closed children.
pub(crate) fn validate_parent(
    parent: Option<ItemId>,
    allowed: &[PayeeType],
    child_closed: bool,
    set: &EditSet,
    errors: &mut ErrorList,
) {
    let Some(parent) = parent else {
        errors.add(FieldId::Parent, "Required field is empty");
        return;
    };
    match set.payees.live(parent) {
        Ok(payee) => {
            let payee = payee.values();
            if !allowed.contains(&payee.category) {
                errors.add(
                    FieldId::Parent,
                    format!("Payee type {} cannot own this account", payee.category.as_str()),
                );
            }
            if payee.closed && !child_closed {
                errors.add(FieldId::Parent, "Parent payee is closed");
            }
        }
        Err(err) => errors.add(FieldId::Parent, err.to_string()),
    }
}

/// Money-valued info must be in the owner's currency
pub(crate) fn check_info_currency(
    class: AccountInfoClass,
    value: &InfoValue,
    currency: &Currency,
    errors: &mut ErrorList,
) {
    let found = match value {
        InfoValue::Money(m) => Some(&m.currency),
        InfoValue::Price(p) => Some(p.currency()),
        _ => None,
    };
    if let Some(found) = found {
        if found != currency {
            errors.add(
                class.field(),
                format!("Currency {} does not match account currency {}", found, currency),
            );
        }
    }
}
