// 📈 Security Entity - shares, funds, bonds, options, physical assets
//
// Traded securities need a ticker symbol (unique across the book); options
// must name their underlying stock and strike price.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{
    check_info_currency, validate_desc, validate_name, validate_parent, AccountInfoClass,
    PayeeType,
};
use crate::editset::EditSet;
use crate::error::MoneyWiseError;
use crate::infoset::{FieldRequired, InfoClass, InfoOwner, InfoSet, InfoValue};
use crate::item::{diff_field, DataItem, FieldId, ItemId, ItemKind};
use crate::money::Currency;
use crate::validation::ErrorList;

// ============================================================================
// SECURITY TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    Shares,
    GrowthUnitTrust,
    IncomeUnitTrust,
    LifeBond,
    Endowment,
    Property,
    Vehicle,
    Asset,
    Option,
    DefinedContribution,
    StatePension,
}

impl SecurityType {
    pub fn all() -> &'static [SecurityType] {
        &[
            SecurityType::Shares,
            SecurityType::GrowthUnitTrust,
            SecurityType::IncomeUnitTrust,
            SecurityType::LifeBond,
            SecurityType::Endowment,
            SecurityType::Property,
            SecurityType::Vehicle,
            SecurityType::Asset,
            SecurityType::Option,
            SecurityType::DefinedContribution,
            SecurityType::StatePension,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityType::Shares => "Shares",
            SecurityType::GrowthUnitTrust => "GrowthUnitTrust",
            SecurityType::IncomeUnitTrust => "IncomeUnitTrust",
            SecurityType::LifeBond => "LifeBond",
            SecurityType::Endowment => "Endowment",
            SecurityType::Property => "Property",
            SecurityType::Vehicle => "Vehicle",
            SecurityType::Asset => "Asset",
            SecurityType::Option => "Option",
            SecurityType::DefinedContribution => "DefinedContribution",
            SecurityType::StatePension => "StatePension",
        }
    }

    pub fn is_singular(&self) -> bool {
        *self == SecurityType::StatePension
    }

    pub fn is_unit_trust(&self) -> bool {
        matches!(
            self,
            SecurityType::GrowthUnitTrust | SecurityType::IncomeUnitTrust
        )
    }

    /// Listed on a market, so needs a ticker symbol
    pub fn needs_symbol(&self) -> bool {
        matches!(self, SecurityType::Shares | SecurityType::Option) || self.is_unit_trust()
    }

    pub fn needs_region(&self) -> bool {
        *self == SecurityType::Shares || self.is_unit_trust()
    }

    pub fn is_option(&self) -> bool {
        *self == SecurityType::Option
    }
}

impl FromStr for SecurityType {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecurityType::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MoneyWiseError::UnknownName {
                kind: "security type",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// SECURITY ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Security {
    pub name: String,
    pub desc: Option<String>,
    pub category: SecurityType,
    /// Issuer (Payee)
    pub parent: Option<ItemId>,
    pub currency: Currency,
    pub closed: bool,
    pub info: InfoSet<AccountInfoClass>,
}

impl Security {
    pub fn new(
        name: impl Into<String>,
        category: SecurityType,
        parent: ItemId,
        currency: Currency,
    ) -> Self {
        Security {
            name: name.into(),
            desc: None,
            category,
            parent: Some(parent),
            currency,
            closed: false,
            info: InfoSet::new(),
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.info.get(AccountInfoClass::Symbol).and_then(|v| v.as_text())
    }

    pub const PARENT_TYPES: &'static [PayeeType] = &[
        PayeeType::Institution,
        PayeeType::Employer,
        PayeeType::Government,
        PayeeType::Market,
    ];
}

impl InfoOwner<AccountInfoClass> for Security {
    fn is_class_required(&self, class: AccountInfoClass, _set: &EditSet) -> FieldRequired {
        match class {
            AccountInfoClass::Symbol => FieldRequired::must_if(self.category.needs_symbol()),
            AccountInfoClass::Region => {
                if self.category.needs_region() {
                    FieldRequired::MustExist
                } else {
                    FieldRequired::CanExist
                }
            }
            AccountInfoClass::UnderlyingStock | AccountInfoClass::OptionPrice => {
                FieldRequired::must_if(self.category.is_option())
            }
            AccountInfoClass::GrantDate => FieldRequired::can_if(self.category.is_option()),
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
            AccountInfoClass::OptionPrice => {
                check_info_currency(class, value, &self.currency, errors);
                if value.as_price().map_or(false, |p| !p.is_positive()) {
                    errors.add(class.field(), "Option price must be positive");
                }
            }
            AccountInfoClass::UnderlyingStock => {
                if let Some(stock) = value.as_link() {
                    match set.securities.live(stock) {
                        Ok(item) if item.values().category != SecurityType::Shares => errors.add(
                            class.field(),
                            "Underlying stock must be a Shares security",
                        ),
                        Ok(_) => {}
                        Err(err) => errors.add(class.field(), err.to_string()),
                    }
                }
            }
            _ => {}
        }
    }
}

impl DataItem for Security {
    const KIND: ItemKind = ItemKind::Security;

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

    fn validate(&self, id: ItemId, set: &EditSet, errors: &mut ErrorList) {
        validate_name(&self.name, errors);
        validate_desc(&self.desc, errors);
        validate_parent(self.parent, Self::PARENT_TYPES, self.closed, set, errors);

        let underlying = AccountInfoClass::UnderlyingStock;
        if self.info.get(underlying).and_then(|v| v.as_link()) == Some(id) {
            errors.add(underlying.field(), "Option cannot be its own underlying stock");
        }

        if let Some(symbol) = self.symbol() {
            let clash = set.securities.iter().any(|other| {
                other.id() != id
                    && other
                        .values()
                        .symbol()
                        .map_or(false, |s| s.eq_ignore_ascii_case(symbol))
            });
            if clash {
                errors.add(
                    AccountInfoClass::Symbol.field(),
                    format!("Symbol '{}' is already in use", symbol),
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
