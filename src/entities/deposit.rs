// 💳 Deposit Entity - bank and savings accounts
//
// A deposit is owned by an institution (or government for savings bonds),
// has a single currency, and bonds carry a maturity date.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{
    check_info_currency, validate_desc, validate_name, validate_parent, AccountInfoClass,
    PayeeType,
};
use crate::editset::EditSet;
use crate::error::MoneyWiseError;
use crate::infoset::{FieldRequired, InfoOwner, InfoSet, InfoValue};
use crate::item::{diff_field, DataItem, FieldId, ItemId, ItemKind};
use crate::money::Currency;
use crate::validation::ErrorList;

// ============================================================================
// DEPOSIT CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositCategory {
    Checking,
    Savings,
    TaxFreeSavings,
    Peer2Peer,
    Bond,
    TaxFreeBond,
}

impl DepositCategory {
    pub fn all() -> &'static [DepositCategory] {
        &[
            DepositCategory::Checking,
            DepositCategory::Savings,
            DepositCategory::TaxFreeSavings,
            DepositCategory::Peer2Peer,
            DepositCategory::Bond,
            DepositCategory::TaxFreeBond,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepositCategory::Checking => "Checking",
            DepositCategory::Savings => "Savings",
            DepositCategory::TaxFreeSavings => "TaxFreeSavings",
            DepositCategory::Peer2Peer => "Peer2Peer",
            DepositCategory::Bond => "Bond",
            DepositCategory::TaxFreeBond => "TaxFreeBond",
        }
    }

    pub fn has_maturity(&self) -> bool {
        matches!(self, DepositCategory::Bond | DepositCategory::TaxFreeBond)
    }

    pub fn is_tax_free(&self) -> bool {
        matches!(
            self,
            DepositCategory::TaxFreeSavings | DepositCategory::TaxFreeBond
        )
    }
}

impl FromStr for DepositCategory {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DepositCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MoneyWiseError::UnknownName {
                kind: "deposit category",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// DEPOSIT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Deposit {
    pub name: String,
    pub desc: Option<String>,
    pub category: DepositCategory,
    /// Owning institution (Payee)
    pub parent: Option<ItemId>,
    pub currency: Currency,
    pub closed: bool,
    pub info: InfoSet<AccountInfoClass>,
}

impl Deposit {
    pub fn new(
        name: impl Into<String>,
        category: DepositCategory,
        parent: ItemId,
        currency: Currency,
    ) -> Self {
        Deposit {
            name: name.into(),
            desc: None,
            category,
            parent: Some(parent),
            currency,
            closed: false,
            info: InfoSet::new(),
        }
    }

    pub const PARENT_TYPES: &'static [PayeeType] = &[PayeeType::Institution, PayeeType::Government];
}

impl InfoOwner<AccountInfoClass> for Deposit {
    fn is_class_required(&self, class: AccountInfoClass, _set: &EditSet) -> FieldRequired {
        match class {
            AccountInfoClass::Maturity => FieldRequired::must_if(self.category.has_maturity()),
            AccountInfoClass::OpeningBalance | AccountInfoClass::Notes => FieldRequired::CanExist,
            c if c.is_credential() => FieldRequired::CanExist,
            _ => FieldRequired::NotAllowed,
        }
    }

    fn validate_class(
        &self,
        class: AccountInfoClass,
        value: &InfoValue,
        _set: &EditSet,
        errors: &mut ErrorList,
    ) {
        check_info_currency(class, value, &self.currency, errors);
    }
}

impl DataItem for Deposit {
    const KIND: ItemKind = ItemKind::Deposit;

    fn differences(&self, other: &Self) -> Vec<FieldId> {
        let mut out = Vec::new();
        diff_field(&mut out, FieldId::Name, &self.name, &other.name);
        diff_field(&mut out, FieldId::Desc, &self.desc, &other.desc);
        diff_field(&mut out, FieldId::Category, &self.category, &other.category);
        diff_field(&mut out, FieldId::Parent, &self.parent, &other.parent);
        diff_field(&mut out, FieldId::Currency, &self.currency, &other.currency);
        diff_field(&mut out, FieldId::Closed, &self.closed, &other.closed);
        self.info.diff_fields(&other.info, &mut out);
        out
    }

    fn validate(&self, _id: ItemId, set: &EditSet, errors: &mut ErrorList) {
        validate_name(&self.name, errors);
        validate_desc(&self.desc, errors);
        validate_parent(self.parent, Self::PARENT_TYPES, self.closed, set, errors);
        self.info.validate(self, set, errors);
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Payee;
    use crate::money::Money;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn set_with_bank() -> (EditSet, ItemId) {
        let mut set = EditSet::new();
        let bank = set.payees.add(Payee::new("Barclays", PayeeType::Institution));
        (set, bank)
    }

    #[test]
    fn test_bond_requires_maturity() {
        let (set, bank) = set_with_bank();
        let mut bond = Deposit::new("Bond 2027", DepositCategory::Bond, bank, Currency::gbp());

        let mut errors = ErrorList::new();
        bond.validate(ItemId::new(), &set, &mut errors);
        assert_eq!(
            errors.for_field(FieldId::Info("Maturity")),
            vec!["Required info is missing"]
        );

        bond.info
            .set(
                AccountInfoClass::Maturity,
                InfoValue::Date(NaiveDate::from_ymd_opt(2027, 6, 1).unwrap()),
            )
            .unwrap();
        let mut errors = ErrorList::new();
        bond.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_maturity_not_allowed_on_checking() {
        let (set, bank) = set_with_bank();
        let mut current = Deposit::new("Current", DepositCategory::Checking, bank, Currency::gbp());
        current
            .info
            .set(
                AccountInfoClass::Maturity,
                InfoValue::Date(NaiveDate::from_ymd_opt(2027, 6, 1).unwrap()),
            )
            .unwrap();

        let mut errors = ErrorList::new();
        current.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.has_field(FieldId::Info("Maturity")));
    }

    #[test]
    fn test_opening_balance_currency_must_match() {
        let (set, bank) = set_with_bank();
        let mut current = Deposit::new("Current", DepositCategory::Checking, bank, Currency::gbp());
        current
            .info
            .set(
                AccountInfoClass::OpeningBalance,
                InfoValue::Money(Money::new(dec!(100), Currency::new("USD").unwrap())),
            )
            .unwrap();

        let mut errors = ErrorList::new();
        current.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.has_field(FieldId::Info("OpeningBalance")));
    }

    #[test]
    fn test_parent_type_restricted() {
        let mut set = EditSet::new();
        let shop = set.payees.add(Payee::new("Tesco", PayeeType::Payee));
        let deposit = Deposit::new("Odd", DepositCategory::Savings, shop, Currency::gbp());

        let mut errors = ErrorList::new();
        deposit.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.has_field(FieldId::Parent));
    }

    #[test]
    fn test_tax_free_categories() {
        assert!(DepositCategory::TaxFreeSavings.is_tax_free());
        assert!(!DepositCategory::Savings.is_tax_free());
        assert_eq!("peer2peer".parse::<DepositCategory>().unwrap(), DepositCategory::Peer2Peer);
    }
}
