// 💵 Cash Entity - wallets and auto-expense accounts
//
// An AutoExpense cash account books every withdrawal straight to an expense
// category and payee, so both must be named in its info set.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{check_info_currency, validate_desc, validate_name, AccountInfoClass};
use crate::editset::EditSet;
use crate::error::MoneyWiseError;
use crate::infoset::{FieldRequired, InfoClass, InfoOwner, InfoSet, InfoValue};
use crate::item::{diff_field, DataItem, FieldId, ItemId, ItemKind};
use crate::money::Currency;
use crate::validation::ErrorList;

use super::transaction::TransactionCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CashCategory {
    Cash,
    AutoExpense,
}

impl CashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashCategory::Cash => "Cash",
            CashCategory::AutoExpense => "AutoExpense",
        }
    }
}

impl FromStr for CashCategory {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [CashCategory::Cash, CashCategory::AutoExpense]
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MoneyWiseError::UnknownName {
                kind: "cash category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cash {
    pub name: String,
    pub desc: Option<String>,
    pub category: CashCategory,
    pub currency: Currency,
    pub closed: bool,
    pub info: InfoSet<AccountInfoClass>,
}

impl Cash {
    pub fn new(name: impl Into<String>, category: CashCategory, currency: Currency) -> Self {
        Cash {
            name: name.into(),
            desc: None,
            category,
            currency,
            closed: false,
            info: InfoSet::new(),
        }
    }

    pub fn is_auto_expense(&self) -> bool {
        self.category == CashCategory::AutoExpense
    }
}

impl InfoOwner<AccountInfoClass> for Cash {
    fn is_class_required(&self, class: AccountInfoClass, _set: &EditSet) -> FieldRequired {
        match class {
            AccountInfoClass::AutoExpense | AccountInfoClass::AutoPayee => {
                FieldRequired::must_if(self.is_auto_expense())
            }
            AccountInfoClass::OpeningBalance => FieldRequired::can_if(!self.is_auto_expense()),
            AccountInfoClass::Notes => FieldRequired::CanExist,
            _ => FieldRequired::NotAllowed,
        }
    }

    fn validate_class(
        &self,
        class: AccountInfoClass,
        value: &InfoValue,
        set: &EditSet,
        errors: &mut ErrorList,
    ) {
        match class {
            AccountInfoClass::AutoExpense => {
                let category = value.as_text().unwrap_or_default();
                match category.parse::<TransactionCategory>() {
                    Ok(c) if c.is_expense() => {}
                    Ok(c) => errors.add(
                        class.field(),
                        format!("{} is not an expense category", c.as_str()),
                    ),
                    Err(err) => errors.add(class.field(), err.to_string()),
                }
            }
            AccountInfoClass::AutoPayee => {
                if let Some(payee) = value.as_link() {
                    if let Err(err) = set.payees.live(payee) {
                        errors.add(class.field(), err.to_string());
                    }
                }
            }
            _ => check_info_currency(class, value, &self.currency, errors),
        }
    }
}

impl DataItem for Cash {
    const KIND: ItemKind = ItemKind::Cash;

    fn differences(&self, other: &Self) -> Vec<FieldId> {
        let mut out = Vec::new();
        diff_field(&mut out, FieldId::Name, &self.name, &other.name);
        diff_field(&mut out, FieldId::Desc, &self.desc, &other.desc);
        diff_field(&mut out, FieldId::Category, &self.category, &other.category);
        diff_field(&mut out, FieldId::Currency, &self.currency, &other.currency);
        diff_field(&mut out, FieldId::Closed, &self.closed, &other.closed);
        self.info.diff_fields(&other.info, &mut out);
        out
    }

    fn validate(&self, _id: ItemId, set: &EditSet, errors: &mut ErrorList) {
        validate_name(&self.name, errors);
        validate_desc(&self.desc, errors);
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
    use crate::entities::{Payee, PayeeType};

    #[test]
    fn test_auto_expense_needs_category_and_payee() {
        let set = EditSet::new();
        let wallet = Cash::new("Petrol", CashCategory::AutoExpense, Currency::gbp());

        let mut errors = ErrorList::new();
        wallet.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.has_field(FieldId::Info("AutoExpense")));
        assert!(errors.has_field(FieldId::Info("AutoPayee")));
    }

    #[test]
    fn test_auto_expense_valid() {
        let mut set = EditSet::new();
        let shell = set.payees.add(Payee::new("Shell", PayeeType::Payee));

        let mut wallet = Cash::new("Petrol", CashCategory::AutoExpense, Currency::gbp());
        wallet
            .info
            .set(AccountInfoClass::AutoExpense, InfoValue::Text("Expense".to_string()))
            .unwrap();
        wallet
            .info
            .set(AccountInfoClass::AutoPayee, InfoValue::Link(shell))
            .unwrap();

        let mut errors = ErrorList::new();
        wallet.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_auto_expense_rejects_income_category() {
        let mut set = EditSet::new();
        let shell = set.payees.add(Payee::new("Shell", PayeeType::Payee));

        let mut wallet = Cash::new("Petrol", CashCategory::AutoExpense, Currency::gbp());
        wallet
            .info
            .set(AccountInfoClass::AutoExpense, InfoValue::Text("Interest".to_string()))
            .unwrap();
        wallet
            .info
            .set(AccountInfoClass::AutoPayee, InfoValue::Link(shell))
            .unwrap();

        let mut errors = ErrorList::new();
        wallet.validate(ItemId::new(), &set, &mut errors);
        assert_eq!(
            errors.for_field(FieldId::Info("AutoExpense")),
            vec!["Interest is not an expense category"]
        );
    }

    #[test]
    fn test_plain_cash_rejects_auto_fields() {
        let set = EditSet::new();
        let mut wallet = Cash::new("Wallet", CashCategory::Cash, Currency::gbp());
        wallet
            .info
            .set(AccountInfoClass::AutoExpense, InfoValue::Text("Expense".to_string()))
            .unwrap();

        let mut errors = ErrorList::new();
        wallet.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.has_field(FieldId::Info("AutoExpense")));
        assert!(!errors.has_field(FieldId::Info("AutoPayee")));
    }
}
