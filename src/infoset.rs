// 🏛️ Info Sets - sparse typed extension fields
//
// An InfoSet maps an info class to a typed value for ONE owning item.
// Which classes may appear is not fixed: the owner decides per class whether
// it must exist, can exist or is not allowed, usually from its category.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;

use crate::editset::EditSet;
use crate::error::{MoneyWiseError, Result};
use crate::item::{FieldId, ItemId};
use crate::money::{Money, Price, Ratio, Units};
use crate::validation::ErrorList;

// ============================================================================
// DATA TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoDataType {
    Text,
    Money,
    Units,
    Price,
    Ratio,
    Date,
    Integer,
    Link,
    Tags,
}

impl InfoDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoDataType::Text => "text",
            InfoDataType::Money => "money",
            InfoDataType::Units => "units",
            InfoDataType::Price => "price",
            InfoDataType::Ratio => "ratio",
            InfoDataType::Date => "date",
            InfoDataType::Integer => "integer",
            InfoDataType::Link => "link",
            InfoDataType::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Text(String),
    Money(Money),
    Units(Units),
    Price(Price),
    Ratio(Ratio),
    Date(NaiveDate),
    Integer(i64),
    Link(ItemId),
    Tags(BTreeSet<String>),
}

impl InfoValue {
    pub fn data_type(&self) -> InfoDataType {
        match self {
            InfoValue::Text(_) => InfoDataType::Text,
            InfoValue::Money(_) => InfoDataType::Money,
            InfoValue::Units(_) => InfoDataType::Units,
            InfoValue::Price(_) => InfoDataType::Price,
            InfoValue::Ratio(_) => InfoDataType::Ratio,
            InfoValue::Date(_) => InfoDataType::Date,
            InfoValue::Integer(_) => InfoDataType::Integer,
            InfoValue::Link(_) => InfoDataType::Link,
            InfoValue::Tags(_) => InfoDataType::Tags,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            InfoValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<&Money> {
        match self {
            InfoValue::Money(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_units(&self) -> Option<Units> {
        match self {
            InfoValue::Units(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<&Price> {
        match self {
            InfoValue::Price(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_ratio(&self) -> Option<Ratio> {
        match self {
            InfoValue::Ratio(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            InfoValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            InfoValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<ItemId> {
        match self {
            InfoValue::Link(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&BTreeSet<String>> {
        match self {
            InfoValue::Tags(t) => Some(t),
            _ => None,
        }
    }
}

// ============================================================================
// INFO CLASS
// ============================================================================

/// An enumeration of the info classes one kind of owner can carry
pub trait InfoClass: Copy + Eq + Ord + Hash + fmt::Debug + 'static {
    fn all() -> &'static [Self];

    fn name(&self) -> &'static str;

    fn data_type(&self) -> InfoDataType;

    /// Maximum length of a text value
    fn max_length(&self) -> Option<usize> {
        None
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    fn field(&self) -> FieldId {
        FieldId::Info(self.name())
    }
}

/// Membership rule for one class on one owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRequired {
    MustExist,
    CanExist,
    NotAllowed,
}

impl FieldRequired {
    pub fn allowed(&self) -> bool {
        !matches!(self, FieldRequired::NotAllowed)
    }

    /// MustExist when `condition` holds, NotAllowed otherwise
    pub fn must_if(condition: bool) -> Self {
        if condition {
            FieldRequired::MustExist
        } else {
            FieldRequired::NotAllowed
        }
    }

    /// CanExist when `condition` holds, NotAllowed otherwise
    pub fn can_if(condition: bool) -> Self {
        if condition {
            FieldRequired::CanExist
        } else {
            FieldRequired::NotAllowed
        }
    }
}

/// The item that owns an info set and decides its rules
pub trait InfoOwner<C: InfoClass> {
    fn is_class_required(&self, class: C, set: &EditSet) -> FieldRequired;

    /// Value checks beyond type and length
    fn validate_class(
        &self,
        _class: C,
        _value: &InfoValue,
        _set: &EditSet,
        _errors: &mut ErrorList,
    ) {
    }
}

// ============================================================================
// INFO SET
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct InfoSet<C: InfoClass> {
    values: BTreeMap<C, InfoValue>,
}

impl<C: InfoClass> InfoSet<C> {
    pub fn new() -> Self {
        InfoSet {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, class: C) -> Option<&InfoValue> {
        self.values.get(&class)
    }

    pub fn contains(&self, class: C) -> bool {
        self.values.contains_key(&class)
    }

    /// Set a value; the value type must match the class
    pub fn set(&mut self, class: C, value: InfoValue) -> Result<()> {
        if value.data_type() != class.data_type() {
            return Err(MoneyWiseError::InfoTypeMismatch {
                class: class.name(),
                expected: class.data_type().as_str(),
            });
        }
        self.values.insert(class, value);
        Ok(())
    }

    /// Builder form of `set`
    pub fn with(mut self, class: C, value: InfoValue) -> Result<Self> {
        self.set(class, value)?;
        Ok(self)
    }

    pub fn remove(&mut self, class: C) -> Option<InfoValue> {
        self.values.remove(&class)
    }

    pub fn iter(&self) -> impl Iterator<Item = (C, &InfoValue)> {
        self.values.iter().map(|(c, v)| (*c, v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Classes whose values differ between the two sets
    pub fn differences(&self, other: &InfoSet<C>) -> Vec<C> {
        C::all()
            .iter()
            .copied()
            .filter(|c| self.values.get(c) != other.values.get(c))
            .collect()
    }

    /// Append differing classes as info fields
    pub fn diff_fields(&self, other: &InfoSet<C>, out: &mut Vec<FieldId>) {
        out.extend(self.differences(other).into_iter().map(|c| c.field()));
    }

    /// Check membership rules, text lengths, then the owner's value checks
    pub fn validate<O: InfoOwner<C>>(&self, owner: &O, set: &EditSet, errors: &mut ErrorList) {
        for &class in C::all() {
            let rule = owner.is_class_required(class, set);
            match (rule, self.values.get(&class)) {
                (FieldRequired::MustExist, None) => {
                    errors.add(class.field(), "Required info is missing");
                }
                (FieldRequired::NotAllowed, Some(_)) => {
                    errors.add(class.field(), "Info is not allowed for this item");
                }
                (_, Some(value)) => {
                    if let (Some(max), Some(text)) = (class.max_length(), value.as_text()) {
                        if text.chars().count() > max {
                            errors.add(
                                class.field(),
                                format!("Exceeds maximum length of {}", max),
                            );
                        }
                    }
                    owner.validate_class(class, value, set, errors);
                }
                (_, None) => {}
            }
        }
    }
}

impl<C: InfoClass> Default for InfoSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
