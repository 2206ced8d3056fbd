// 🏦 Payee Entity - counterparties and account owners
//
// Payees are the far side of income and expense transactions, and the
// parents (institutions, employers, ...) of deposits, loans, portfolios and
// securities. Government, TaxMan and Market exist at most once per book.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{validate_desc, validate_name, AccountInfoClass};
use crate::editset::EditSet;
use crate::error::MoneyWiseError;
use crate::infoset::{FieldRequired, InfoOwner, InfoSet};
use crate::item::{diff_field, DataItem, FieldId, ItemId, ItemKind};
use crate::validation::ErrorList;

// ============================================================================
// PAYEE TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayeeType {
    /// Shop, utility, anyone paid for goods or services
    Payee,
    Employer,
    /// Bank, building society, broker
    Institution,
    Individual,
    Inheritance,
    Government,
    TaxMan,
    /// Notional counterparty for market price movements
    Market,
}

impl PayeeType {
    pub fn all() -> &'static [PayeeType] {
        &[
            PayeeType::Payee,
            PayeeType::Employer,
            PayeeType::Institution,
            PayeeType::Individual,
            PayeeType::Inheritance,
            PayeeType::Government,
            PayeeType::TaxMan,
            PayeeType::Market,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayeeType::Payee => "Payee",
            PayeeType::Employer => "Employer",
            PayeeType::Institution => "Institution",
            PayeeType::Individual => "Individual",
            PayeeType::Inheritance => "Inheritance",
            PayeeType::Government => "Government",
            PayeeType::TaxMan => "TaxMan",
            PayeeType::Market => "Market",
        }
    }

    /// At most one payee of this type per book
    pub fn is_singular(&self) -> bool {
        matches!(self, PayeeType::Government | PayeeType::TaxMan | PayeeType::Market)
    }

    /// Not a real organisation one holds credentials with
    pub fn is_notional(&self) -> bool {
        matches!(self, PayeeType::TaxMan | PayeeType::Market)
    }
}

impl FromStr for PayeeType {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayeeType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MoneyWiseError::UnknownName {
                kind: "payee type",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// PAYEE ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Payee {
    pub name: String,
    pub desc: Option<String>,
    pub category: PayeeType,
    pub closed: bool,
    pub info: InfoSet<AccountInfoClass>,
}

impl Payee {
    pub fn new(name: impl Into<String>, category: PayeeType) -> Self {
        Payee {
            name: name.into(),
            desc: None,
            category,
            closed: false,
            info: InfoSet::new(),
        }
    }

    /// Builder: add description
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

impl InfoOwner<AccountInfoClass> for Payee {
    fn is_class_required(&self, class: AccountInfoClass, _set: &EditSet) -> FieldRequired {
        match class {
            AccountInfoClass::Notes => FieldRequired::CanExist,
            c if c.is_credential() => FieldRequired::can_if(!self.category.is_notional()),
            _ => FieldRequired::NotAllowed,
        }
    }
}

impl DataItem for Payee {
    const KIND: ItemKind = ItemKind::Payee;

    fn differences(&self, other: &Self) -> Vec<FieldId> {
        let mut out = Vec::new();
        diff_field(&mut out, FieldId::Name, &self.name, &other.name);
        diff_field(&mut out, FieldId::Desc, &self.desc, &other.desc);
        diff_field(&mut out, FieldId::Category, &self.category, &other.category);
        diff_field(&mut out, FieldId::Closed, &self.closed, &other.closed);
        self.info.diff_fields(&other.info, &mut out);
        out
    }

    fn validate(&self, id: ItemId, set: &EditSet, errors: &mut ErrorList) {
        validate_name(&self.name, errors);
        validate_desc(&self.desc, errors);

        // cannot close a payee that still owns open accounts
        if self.closed {
            let open_children = set.open_children_of(id);
            if open_children > 0 {
                errors.add(
                    FieldId::Closed,
                    format!("Payee still owns {} open accounts", open_children),
                );
            }
        }

        self.info.validate(self, set, errors);
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn singular_class(&self) -> Option<&'static str> {
        if self.category.is_singular() {
            Some(self.category.as_str())
        } else {
            None
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// TESTS
// ============================================================================
