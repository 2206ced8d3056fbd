// 📁 Portfolio Entity - brokerage accounts holding securities
//
// A portfolio is held at an institution. Holdings in TaxFree, Pension or
// SIPP portfolios are sheltered from tax. Only one Pension portfolio exists.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{validate_desc, validate_name, validate_parent, AccountInfoClass, PayeeType};
use crate::editset::EditSet;
use crate::error::MoneyWiseError;
use crate::infoset::{FieldRequired, InfoOwner, InfoSet};
use crate::item::{diff_field, DataItem, FieldId, ItemId, ItemKind};
use crate::money::Currency;
use crate::validation::ErrorList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortfolioType {
    Standard,
    TaxFree,
    Pension,
    SIPP,
}

impl PortfolioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortfolioType::Standard => "Standard",
            PortfolioType::TaxFree => "TaxFree",
            PortfolioType::Pension => "Pension",
            PortfolioType::SIPP => "SIPP",
        }
    }

    pub fn is_singular(&self) -> bool {
        *self == PortfolioType::Pension
    }

    pub fn is_tax_free(&self) -> bool {
        !matches!(self, PortfolioType::Standard)
    }
}

impl FromStr for PortfolioType {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            PortfolioType::Standard,
            PortfolioType::TaxFree,
            PortfolioType::Pension,
            PortfolioType::SIPP,
        ]
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| MoneyWiseError::UnknownName {
            kind: "portfolio type",
            value: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub name: String,
    pub desc: Option<String>,
    pub category: PortfolioType,
    /// Broker (Payee)
    pub parent: Option<ItemId>,
    pub currency: Currency,
    pub closed: bool,
    pub info: InfoSet<AccountInfoClass>,
}

impl Portfolio {
    pub fn new(
        name: impl Into<String>,
        category: PortfolioType,
        parent: ItemId,
        currency: Currency,
    ) -> Self {
        Portfolio {
            name: name.into(),
            desc: None,
            category,
            parent: Some(parent),
            currency,
            closed: false,
            info: InfoSet::new(),
        }
    }

    pub const PARENT_TYPES: &'static [PayeeType] = &[PayeeType::Institution];
}

impl InfoOwner<AccountInfoClass> for Portfolio {
    fn is_class_required(&self, class: AccountInfoClass, _set: &EditSet) -> FieldRequired {
        match class {
            AccountInfoClass::Notes => FieldRequired::CanExist,
            c if c.is_credential() => FieldRequired::CanExist,
            _ => FieldRequired::NotAllowed,
        }
    }
}

impl DataItem for Portfolio {
    const KIND: ItemKind = ItemKind::Portfolio;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Payee;

    #[test]
    fn test_tax_free_types() {
        assert!(PortfolioType::SIPP.is_tax_free());
        assert!(PortfolioType::Pension.is_tax_free());
        assert!(!PortfolioType::Standard.is_tax_free());
    }

    #[test]
    fn test_pension_is_singular() {
        let mut set = EditSet::new();
        let broker = set.payees.add(Payee::new("Broker", PayeeType::Institution));
        let pension = Portfolio::new("Pension", PortfolioType::Pension, broker, Currency::gbp());
        let isa = Portfolio::new("ISA", PortfolioType::TaxFree, broker, Currency::gbp());

        assert_eq!(pension.singular_class(), Some("Pension"));
        assert_eq!(isa.singular_class(), None);

        let mut errors = ErrorList::new();
        isa.validate(ItemId::new(), &set, &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
    }
}
