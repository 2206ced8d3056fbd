// 🧾 Loan Entity - credit cards, mortgages, private loans

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanCategory {
    CreditCard,
    PrivateLoan,
    Loan,
}

impl LoanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanCategory::CreditCard => "CreditCard",
            LoanCategory::PrivateLoan => "PrivateLoan",
            LoanCategory::Loan => "Loan",
        }
    }
}

impl FromStr for LoanCategory {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            LoanCategory::CreditCard,
            LoanCategory::PrivateLoan,
            LoanCategory::Loan,
        ]
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| MoneyWiseError::UnknownName {
            kind: "loan category",
            value: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub name: String,
    pub desc: Option<String>,
    pub category: LoanCategory,
    /// Lender (Payee)
    pub parent: Option<ItemId>,
    pub currency: Currency,
    pub closed: bool,
    pub info: InfoSet<AccountInfoClass>,
}

impl Loan {
    pub fn new(
        name: impl Into<String>,
        category: LoanCategory,
        parent: ItemId,
        currency: Currency,
    ) -> Self {
        Loan {
            name: name.into(),
            desc: None,
            category,
            parent: Some(parent),
            currency,
            closed: false,
            info: InfoSet::new(),
        }
    }

    pub const PARENT_TYPES: &'static [PayeeType] = &[
        PayeeType::Institution,
        PayeeType::Individual,
        PayeeType::Employer,
    ];
}

impl InfoOwner<AccountInfoClass> for Loan {
    fn is_class_required(&self, class: AccountInfoClass, _set: &EditSet) -> FieldRequired {
        match class {
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

impl DataItem for Loan {
    const KIND: ItemKind = ItemKind::Loan;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Payee;

    #[test]
    fn test_private_loan_from_individual() {
        let mut set = EditSet::new();
        let mum = set.payees.add(Payee::new("Mum", PayeeType::Individual));
        let loan = Loan::new("Car loan", LoanCategory::PrivateLoan, mum, Currency::gbp());

        let mut errors = ErrorList::new();
        loan.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_closed_parent_needs_closed_loan() {
        let mut set = EditSet::new();
        let mut bank = Payee::new("Old Bank", PayeeType::Institution);
        bank.closed = true;
        let bank = set.payees.add(bank);

        let mut card = Loan::new("Visa", LoanCategory::CreditCard, bank, Currency::gbp());
        let mut errors = ErrorList::new();
        card.validate(ItemId::new(), &set, &mut errors);
        assert_eq!(errors.for_field(FieldId::Parent), vec!["Parent payee is closed"]);

        card.closed = true;
        let mut errors = ErrorList::new();
        card.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_symbol_not_allowed_on_loan() {
        let mut set = EditSet::new();
        let bank = set.payees.add(Payee::new("Bank", PayeeType::Institution));
        let mut card = Loan::new("Visa", LoanCategory::CreditCard, bank, Currency::gbp());
        card.info
            .set(AccountInfoClass::Symbol, InfoValue::Text("VISA".to_string()))
            .unwrap();

        let mut errors = ErrorList::new();
        card.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.has_field(FieldId::Info("Symbol")));
    }
}
