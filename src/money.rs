// 💷 Money Layer - currencies, amounts, units, prices, ratios
//
// Amounts are exact decimals. Two amounts only combine when their
// currencies agree; anything else is a CurrencyMismatch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MoneyWiseError, Result};

// ============================================================================
// CURRENCY
// ============================================================================

/// ISO 4217 currency code (e.g. "GBP", "USD", "EUR")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Currency(code.to_string()))
        } else {
            Err(MoneyWiseError::InvalidCurrency(code.to_string()))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn gbp() -> Self {
        Currency("GBP".to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self> {
        Currency::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyWiseError;

    fn try_from(value: String) -> Result<Self> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

// ============================================================================
// MONEY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Money::new(Decimal::ZERO, currency)
    }

    /// Parse "123.45" in the given currency
    pub fn parse(amount: &str, currency: &Currency) -> Result<Self> {
        let value = Decimal::from_str(amount.trim()).map_err(|_| MoneyWiseError::UnknownName {
            kind: "amount",
            value: amount.to_string(),
        })?;
        Ok(Money::new(value, currency.clone()))
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Sum in the same currency; errors on a currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| MoneyWiseError::AmountOverflow(format!("{} + {}", self, other)))?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| MoneyWiseError::AmountOverflow(format!("{} - {}", self, other)))?;
        Ok(Money::new(amount, self.currency.clone()))
    }

    pub fn negated(&self) -> Money {
        Money::new(-self.amount, self.currency.clone())
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyWiseError::CurrencyMismatch {
                left: self.currency.to_string(),
                right: other.currency.to_string(),
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.round_dp(2), self.currency)
    }
}

// ============================================================================
// UNITS / PRICE / RATIO
// ============================================================================

/// Number of units of a security (may be fractional)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Units(pub Decimal);

impl Units {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

/// Price of a single unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price(pub Money);

impl Price {
    pub fn currency(&self) -> &Currency {
        &self.0.currency
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Value of a number of units at this price
    pub fn value_of(&self, units: Units) -> Result<Money> {
        let amount = self.0.amount.checked_mul(units.0).ok_or_else(|| {
            MoneyWiseError::AmountOverflow(format!("{} x {} units", self.0, units.0))
        })?;
        Ok(Money::new(amount, self.0.currency.clone()))
    }
}

/// Ratio such as a demerger dilution factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio(pub Decimal);

impl Ratio {
    /// Dilution factors live in (0, 1]
    pub fn is_valid_dilution(&self) -> bool {
        self.0 > Decimal::ZERO && self.0 <= Decimal::ONE
    }
}

// ============================================================================
// TESTS
// ============================================================================
