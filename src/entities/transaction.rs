// 💸 Transaction Entity - a movement of value between two assets
//
// A transaction moves value between its ACCOUNT and its PARTNER:
//   Direction::To   → value leaves the account for the partner
//   Direction::From → value arrives in the account from the partner
//
// Which account/partner shapes are legal, and which info classes must or may
// appear, depends on the category, the direction, the asset classes on each
// side and whether the account is tax-sheltered.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{PayeeType, SecurityType};
use crate::editset::{AssetView, EditSet};
use crate::error::MoneyWiseError;
use crate::infoset::{FieldRequired, InfoClass, InfoDataType, InfoOwner, InfoSet, InfoValue};
use crate::item::{diff_field, DataItem, FieldId, ItemId, ItemKind};
use crate::money::{Currency, Money};
use crate::tax::{TaxYear, TaxYearStart};
use crate::validation::ErrorList;

// ============================================================================
// ASSET REFERENCES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Payee,
    Deposit,
    Cash,
    Loan,
    Portfolio,
    SecurityHolding,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Payee => "Payee",
            AssetClass::Deposit => "Deposit",
            AssetClass::Cash => "Cash",
            AssetClass::Loan => "Loan",
            AssetClass::Portfolio => "Portfolio",
            AssetClass::SecurityHolding => "SecurityHolding",
        }
    }
}

/// One side of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Payee(ItemId),
    Deposit(ItemId),
    Cash(ItemId),
    Loan(ItemId),
    Portfolio(ItemId),
    Holding { portfolio: ItemId, security: ItemId },
}

impl AssetRef {
    pub fn class(&self) -> AssetClass {
        match self {
            AssetRef::Payee(_) => AssetClass::Payee,
            AssetRef::Deposit(_) => AssetClass::Deposit,
            AssetRef::Cash(_) => AssetClass::Cash,
            AssetRef::Loan(_) => AssetClass::Loan,
            AssetRef::Portfolio(_) => AssetClass::Portfolio,
            AssetRef::Holding { .. } => AssetClass::SecurityHolding,
        }
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, AssetRef::Holding { .. })
    }

    pub fn portfolio(&self) -> Option<ItemId> {
        match self {
            AssetRef::Portfolio(id) => Some(*id),
            AssetRef::Holding { portfolio, .. } => Some(*portfolio),
            _ => None,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Holding {
                portfolio,
                security,
            } => write!(f, "Holding {}:{}", portfolio, security),
            AssetRef::Payee(id)
            | AssetRef::Deposit(id)
            | AssetRef::Cash(id)
            | AssetRef::Loan(id)
            | AssetRef::Portfolio(id) => write!(f, "{} {}", self.class().as_str(), id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Value leaves the account
    To,
    /// Value arrives in the account
    From,
}

impl Direction {
    pub fn reverse(&self) -> Direction {
        match self {
            Direction::To => Direction::From,
            Direction::From => Direction::To,
        }
    }
}

impl FromStr for Direction {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "to" => Ok(Direction::To),
            "from" => Ok(Direction::From),
            _ => Err(MoneyWiseError::UnknownName {
                kind: "direction",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// TRANSACTION CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    // Income
    TaxedIncome,
    GrantIncome,
    BenefitIncome,
    Interest,
    Dividend,
    RentalIncome,
    GiftedIncome,
    Inheritance,
    LoyaltyBonus,
    CashBack,
    OtherIncome,
    // Expense
    Expense,
    LocalTaxes,
    // Tax
    IncomeTax,
    TaxRefund,
    // Movement
    Transfer,
    // Security operations
    StockSplit,
    UnitsAdjust,
    StockDeMerger,
    StockTakeOver,
    SecurityReplacement,
    StockRightsIssue,
    ChargeableGain,
}

impl TransactionCategory {
    pub fn all() -> &'static [TransactionCategory] {
        use TransactionCategory::*;
        &[
            TaxedIncome,
            GrantIncome,
            BenefitIncome,
            Interest,
            Dividend,
            RentalIncome,
            GiftedIncome,
            Inheritance,
            LoyaltyBonus,
            CashBack,
            OtherIncome,
            Expense,
            LocalTaxes,
            IncomeTax,
            TaxRefund,
            Transfer,
            StockSplit,
            UnitsAdjust,
            StockDeMerger,
            StockTakeOver,
            SecurityReplacement,
            StockRightsIssue,
            ChargeableGain,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        use TransactionCategory::*;
        match self {
            TaxedIncome => "TaxedIncome",
            GrantIncome => "GrantIncome",
            BenefitIncome => "BenefitIncome",
            Interest => "Interest",
            Dividend => "Dividend",
            RentalIncome => "RentalIncome",
            GiftedIncome => "GiftedIncome",
            Inheritance => "Inheritance",
            LoyaltyBonus => "LoyaltyBonus",
            CashBack => "CashBack",
            OtherIncome => "OtherIncome",
            Expense => "Expense",
            LocalTaxes => "LocalTaxes",
            IncomeTax => "IncomeTax",
            TaxRefund => "TaxRefund",
            Transfer => "Transfer",
            StockSplit => "StockSplit",
            UnitsAdjust => "UnitsAdjust",
            StockDeMerger => "StockDeMerger",
            StockTakeOver => "StockTakeOver",
            SecurityReplacement => "SecurityReplacement",
            StockRightsIssue => "StockRightsIssue",
            ChargeableGain => "ChargeableGain",
        }
    }

    pub fn is_income(&self) -> bool {
        use TransactionCategory::*;
        matches!(
            self,
            TaxedIncome
                | GrantIncome
                | BenefitIncome
                | Interest
                | Dividend
                | RentalIncome
                | GiftedIncome
                | Inheritance
                | LoyaltyBonus
                | CashBack
                | OtherIncome
        )
    }

    pub fn is_expense(&self) -> bool {
        matches!(
            self,
            TransactionCategory::Expense | TransactionCategory::LocalTaxes
        )
    }

    pub fn is_tax(&self) -> bool {
        matches!(
            self,
            TransactionCategory::IncomeTax | TransactionCategory::TaxRefund
        )
    }

    /// Operations that change units but move no money
    pub fn is_units_only(&self) -> bool {
        matches!(
            self,
            TransactionCategory::StockSplit
                | TransactionCategory::UnitsAdjust
                | TransactionCategory::StockDeMerger
        )
    }

    /// Operations between two different holdings in one portfolio
    pub fn is_holding_exchange(&self) -> bool {
        matches!(
            self,
            TransactionCategory::StockDeMerger
                | TransactionCategory::StockTakeOver
                | TransactionCategory::SecurityReplacement
        )
    }

    /// Direction in which money normally flows for this category
    pub fn natural_direction(&self) -> Option<Direction> {
        if self.is_income() || *self == TransactionCategory::TaxRefund {
            Some(Direction::From)
        } else if self.is_expense() || *self == TransactionCategory::IncomeTax {
            Some(Direction::To)
        } else {
            None
        }
    }
}

impl FromStr for TransactionCategory {
    type Err = MoneyWiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MoneyWiseError::UnknownName {
                kind: "transaction category",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// TRANSACTION INFO CLASS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransactionInfoClass {
    TaxCredit,
    EmployerNatIns,
    EmployeeNatIns,
    DeemedBenefit,
    Withheld,
    AccountDeltaUnits,
    PartnerDeltaUnits,
    Dilution,
    ReturnedCashAccount,
    ReturnedCash,
    Price,
    QualifyYears,
    PartnerAmount,
    Reference,
    Comments,
    Tags,
}

impl TransactionInfoClass {
    /// Money values denominated in the account currency
    fn in_account_currency(&self) -> bool {
        matches!(
            self,
            TransactionInfoClass::TaxCredit
                | TransactionInfoClass::EmployerNatIns
                | TransactionInfoClass::EmployeeNatIns
                | TransactionInfoClass::DeemedBenefit
                | TransactionInfoClass::Withheld
        )
    }
}

impl InfoClass for TransactionInfoClass {
    fn all() -> &'static [Self] {
        use TransactionInfoClass::*;
        &[
            TaxCredit,
            EmployerNatIns,
            EmployeeNatIns,
            DeemedBenefit,
            Withheld,
            AccountDeltaUnits,
            PartnerDeltaUnits,
            Dilution,
            ReturnedCashAccount,
            ReturnedCash,
            Price,
            QualifyYears,
            PartnerAmount,
            Reference,
            Comments,
            Tags,
        ]
    }

    fn name(&self) -> &'static str {
        use TransactionInfoClass::*;
        match self {
            TaxCredit => "TaxCredit",
            EmployerNatIns => "EmployerNatIns",
            EmployeeNatIns => "EmployeeNatIns",
            DeemedBenefit => "DeemedBenefit",
            Withheld => "Withheld",
            AccountDeltaUnits => "AccountDeltaUnits",
            PartnerDeltaUnits => "PartnerDeltaUnits",
            Dilution => "Dilution",
            ReturnedCashAccount => "ReturnedCashAccount",
            ReturnedCash => "ReturnedCash",
            Price => "Price",
            QualifyYears => "QualifyYears",
            PartnerAmount => "PartnerAmount",
            Reference => "Reference",
            Comments => "Comments",
            Tags => "Tags",
        }
    }

    fn data_type(&self) -> InfoDataType {
        use TransactionInfoClass::*;
        match self {
            AccountDeltaUnits | PartnerDeltaUnits => InfoDataType::Units,
            Dilution => InfoDataType::Ratio,
            ReturnedCashAccount => InfoDataType::Link,
            Price => InfoDataType::Price,
            QualifyYears => InfoDataType::Integer,
            Reference | Comments => InfoDataType::Text,
            Tags => InfoDataType::Tags,
            _ => InfoDataType::Money,
        }
    }

    fn max_length(&self) -> Option<usize> {
        match self {
            TransactionInfoClass::Reference => Some(20),
            TransactionInfoClass::Comments => Some(50),
            _ => None,
        }
    }
}

// ============================================================================
// TRANSACTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub account: AssetRef,
    pub partner: AssetRef,
    pub category: TransactionCategory,
    pub direction: Direction,
    pub amount: Option<Money>,
    pub reconciled: bool,
    pub info: InfoSet<TransactionInfoClass>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        account: AssetRef,
        partner: AssetRef,
        category: TransactionCategory,
        direction: Direction,
        amount: Option<Money>,
    ) -> Self {
        Transaction {
            date,
            account,
            partner,
            category,
            direction,
            amount,
            reconciled: false,
            info: InfoSet::new(),
        }
    }

    pub fn tax_year(&self, start: TaxYearStart) -> TaxYear {
        TaxYear::for_date(self.date, start)
    }

    /// Money value of an info class, if present
    pub fn info_money(&self, class: TransactionInfoClass) -> Option<&Money> {
        self.info.get(class).and_then(|v| v.as_money())
    }

    /// Money moving against the natural direction of the category
    pub fn is_refund(&self) -> bool {
        self.category
            .natural_direction()
            .map_or(false, |natural| natural != self.direction)
    }

    fn check_shape(&self, account: &AssetView, partner: &AssetView, errors: &mut ErrorList) {
        use AssetClass::*;
        use TransactionCategory::*;

        let acc = account.class;
        let par = partner.class;
        let same = self.account == self.partner;

        let account_ok = match self.category {
            TaxedIncome | GrantIncome | BenefitIncome => matches!(acc, Deposit | Cash),
            Interest => acc == Deposit,
            RentalIncome | GiftedIncome | Inheritance | LoyaltyBonus | CashBack | OtherIncome
            | Expense | LocalTaxes => matches!(acc, Deposit | Cash | Loan),
            IncomeTax | TaxRefund | Transfer => acc != Payee,
            ChargeableGain => {
                acc == SecurityHolding && account.security_type == Some(SecurityType::LifeBond)
            }
            Dividend | StockSplit | UnitsAdjust | StockDeMerger | StockTakeOver
            | SecurityReplacement | StockRightsIssue => acc == SecurityHolding,
        };
        if !account_ok {
            errors.add(
                FieldId::Account,
                format!(
                    "{} account is not valid for {}",
                    acc.as_str(),
                    self.category.as_str()
                ),
            );
        }

        let partner_ok = match self.category {
            TaxedIncome | GrantIncome | BenefitIncome | RentalIncome | GiftedIncome
            | Inheritance | LoyaltyBonus | CashBack | OtherIncome | Expense | LocalTaxes => {
                par == Payee
            }
            Interest => matches!(par, Payee | Deposit),
            Dividend => matches!(par, Deposit | Cash | Portfolio) || same,
            IncomeTax | TaxRefund => partner.payee_type == Some(PayeeType::TaxMan),
            Transfer => par != Payee,
            StockSplit | UnitsAdjust => same,
            StockDeMerger | StockTakeOver | SecurityReplacement => {
                par == SecurityHolding && !same && self.account.portfolio() == self.partner.portfolio()
            }
            StockRightsIssue => matches!(par, Deposit | Cash | Portfolio),
            ChargeableGain => matches!(par, Deposit | Cash),
        };
        if !partner_ok {
            errors.add(
                FieldId::Partner,
                format!(
                    "{} partner is not valid for {}",
                    par.as_str(),
                    self.category.as_str()
                ),
            );
        }

        let same_allowed = matches!(self.category, StockSplit | UnitsAdjust | Dividend);
        if same && !same_allowed {
            errors.add(FieldId::Partner, "Account and partner must differ");
        }
    }

    fn check_amount(&self, account: &AssetView, errors: &mut ErrorList) {
        match &self.amount {
            Some(_) if self.category.is_units_only() => {
                errors.add(
                    FieldId::Amount,
                    format!("{} does not move money", self.category.as_str()),
                );
            }
            Some(amount) => {
                if amount.is_negative() {
                    errors.add(FieldId::Amount, "Amount cannot be negative");
                }
                if let Some(currency) = &account.currency {
                    if &amount.currency != currency {
                        errors.add(
                            FieldId::Amount,
                            format!(
                                "Currency {} does not match account currency {}",
                                amount.currency, currency
                            ),
                        );
                    }
                }
            }
            None if !self.category.is_units_only() => {
                errors.add(FieldId::Amount, "Required field is empty");
            }
            None => {}
        }
    }

    fn account_delta_rule(&self) -> FieldRequired {
        use TransactionCategory::*;
        if !self.account.is_holding() {
            return FieldRequired::NotAllowed;
        }
        match self.category {
            StockSplit | UnitsAdjust | StockRightsIssue => FieldRequired::MustExist,
            Transfer => FieldRequired::can_if(self.direction == Direction::From),
            SecurityReplacement | StockTakeOver | StockDeMerger => FieldRequired::CanExist,
            _ => FieldRequired::NotAllowed,
        }
    }

    fn partner_delta_rule(&self) -> FieldRequired {
        use TransactionCategory::*;
        if !self.partner.is_holding() {
            return FieldRequired::NotAllowed;
        }
        match self.category {
            StockDeMerger | StockTakeOver | SecurityReplacement => FieldRequired::MustExist,
            Transfer => FieldRequired::can_if(self.direction == Direction::To),
            Dividend => FieldRequired::CanExist,
            _ => FieldRequired::NotAllowed,
        }
    }

    /// Currency of one side, if it resolves
    fn side_currency(&self, side: AssetRef, set: &EditSet) -> Option<Currency> {
        set.asset(side).ok().and_then(|view| view.currency)
    }

    fn check_money_currency(
        class: TransactionInfoClass,
        money: &Money,
        expected: Option<Currency>,
        errors: &mut ErrorList,
    ) {
        if let Some(expected) = expected {
            if money.currency != expected {
                errors.add(
                    class.field(),
                    format!("Currency {} should be {}", money.currency, expected),
                );
            }
        }
        if money.is_negative() {
            errors.add(class.field(), "Amount cannot be negative");
        }
    }
}

impl InfoOwner<TransactionInfoClass> for Transaction {
    fn is_class_required(&self, class: TransactionInfoClass, set: &EditSet) -> FieldRequired {
        use TransactionCategory::*;
        use TransactionInfoClass as C;

        match class {
            C::TaxCredit => match self.category {
                TaxedIncome => FieldRequired::MustExist,
                Interest | Dividend | RentalIncome => {
                    let tax_free = set.asset(self.account).map_or(false, |v| v.tax_free);
                    FieldRequired::can_if(!tax_free)
                }
                _ => FieldRequired::NotAllowed,
            },
            C::EmployerNatIns | C::EmployeeNatIns | C::Withheld => {
                FieldRequired::can_if(self.category == TaxedIncome)
            }
            C::DeemedBenefit => FieldRequired::must_if(self.category == BenefitIncome),
            C::AccountDeltaUnits => self.account_delta_rule(),
            C::PartnerDeltaUnits => self.partner_delta_rule(),
            C::Dilution => FieldRequired::must_if(self.category == StockDeMerger),
            C::ReturnedCashAccount => FieldRequired::can_if(self.category == StockTakeOver),
            C::ReturnedCash => FieldRequired::must_if(self.info.contains(C::ReturnedCashAccount)),
            C::Price => FieldRequired::can_if(
                self.account_delta_rule().allowed() || self.partner_delta_rule().allowed(),
            ),
            C::QualifyYears => FieldRequired::must_if(self.category == ChargeableGain),
            C::PartnerAmount => {
                let account = self.side_currency(self.account, set);
                let partner = self.side_currency(self.partner, set);
                match (account, partner) {
                    (Some(a), Some(p)) => FieldRequired::must_if(a != p),
                    _ => FieldRequired::NotAllowed,
                }
            }
            C::Reference | C::Comments | C::Tags => FieldRequired::CanExist,
        }
    }

    fn validate_class(
        &self,
        class: TransactionInfoClass,
        value: &InfoValue,
        set: &EditSet,
        errors: &mut ErrorList,
    ) {
        use TransactionInfoClass as C;

        match class {
            c if c.in_account_currency() => {
                if let Some(money) = value.as_money() {
                    let expected = self.side_currency(self.account, set);
                    Self::check_money_currency(c, money, expected, errors);
                }
            }
            C::PartnerAmount => {
                if let Some(money) = value.as_money() {
                    let expected = self.side_currency(self.partner, set);
                    Self::check_money_currency(class, money, expected, errors);
                }
            }
            C::ReturnedCashAccount => {
                if let Some(id) = value.as_link() {
                    if let Err(err) = set.deposits.live(id) {
                        errors.add(class.field(), err.to_string());
                    }
                }
            }
            C::ReturnedCash => {
                let target = self
                    .info
                    .get(C::ReturnedCashAccount)
                    .and_then(|v| v.as_link())
                    .and_then(|id| set.deposits.live(id).ok())
                    .map(|item| item.values().currency.clone());
                if let Some(money) = value.as_money() {
                    Self::check_money_currency(class, money, target, errors);
                    if money.is_zero() {
                        errors.add(class.field(), "Returned cash must be positive");
                    }
                }
            }
            C::AccountDeltaUnits | C::PartnerDeltaUnits => {
                if let Some(units) = value.as_units() {
                    let may_be_negative = class == C::AccountDeltaUnits
                        && self.category == TransactionCategory::UnitsAdjust;
                    if units.is_zero() {
                        errors.add(class.field(), "Units cannot be zero");
                    } else if !may_be_negative && !units.is_positive() {
                        errors.add(class.field(), "Units must be positive");
                    }
                }
            }
            C::Dilution => {
                if value.as_ratio().map_or(false, |r| !r.is_valid_dilution()) {
                    errors.add(class.field(), "Dilution must be between 0 and 1");
                }
            }
            C::Price => {
                if let Some(price) = value.as_price() {
                    // priced units live on whichever side is a holding
                    let side = if self.account.is_holding() {
                        self.account
                    } else {
                        self.partner
                    };
                    let expected = self.side_currency(side, set);
                    Self::check_money_currency(class, &price.0, expected, errors);
                    if !price.is_positive() {
                        errors.add(class.field(), "Price must be positive");
                    }
                }
            }
            C::QualifyYears => {
                if let Some(years) = value.as_integer() {
                    if !(1..=50).contains(&years) {
                        errors.add(class.field(), "Qualifying years must be between 1 and 50");
                    }
                }
            }
            C::Tags => {
                if let Some(tags) = value.as_tags() {
                    if tags.iter().any(|t| t.trim().is_empty()) {
                        errors.add(class.field(), "Tags cannot be blank");
                    }
                }
            }
            _ => {}
        }
    }
}

impl DataItem for Transaction {
    const KIND: ItemKind = ItemKind::Transaction;

    fn differences(&self, other: &Self) -> Vec<FieldId> {
        let mut out = Vec::new();
        diff_field(&mut out, FieldId::Date, &self.date, &other.date);
        diff_field(&mut out, FieldId::Account, &self.account, &other.account);
        diff_field(&mut out, FieldId::Partner, &self.partner, &other.partner);
        diff_field(&mut out, FieldId::Category, &self.category, &other.category);
        diff_field(&mut out, FieldId::Direction, &self.direction, &other.direction);
        diff_field(&mut out, FieldId::Amount, &self.amount, &other.amount);
        diff_field(&mut out, FieldId::Reconciled, &self.reconciled, &other.reconciled);
        self.info.diff_fields(&other.info, &mut out);
        out
    }

    fn validate(&self, _id: ItemId, set: &EditSet, errors: &mut ErrorList) {
        if self.account.class() == AssetClass::Payee {
            errors.add(FieldId::Account, "Account cannot be a payee");
        }

        let account = set.asset(self.account);
        let partner = set.asset(self.partner);
        if let Err(err) = &account {
            errors.add(FieldId::Account, err.to_string());
        }
        if let Err(err) = &partner {
            errors.add(FieldId::Partner, err.to_string());
        }

        if let (Ok(account), Ok(partner)) = (&account, &partner) {
            self.check_shape(account, partner, errors);
            self.check_amount(account, errors);

            if !self.reconciled {
                if account.closed {
                    errors.add(FieldId::Account, "Account is closed");
                }
                if partner.closed {
                    errors.add(FieldId::Partner, "Partner is closed");
                }
            }
        }

        self.info.validate(self, set, errors);
    }

    fn label(&self) -> String {
        format!("{} {}", self.date, self.category.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        Deposit, DepositCategory, Payee, Portfolio, PortfolioType, Security,
    };
    use crate::money::{Price, Ratio, Units};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Book {
        set: EditSet,
        employer: ItemId,
        taxman: ItemId,
        current: ItemId,
        isa_cash: ItemId,
        usd_account: ItemId,
        broker_gbp: ItemId,
        shares_a: ItemId,
        shares_b: ItemId,
    }

    fn gbp(amount: Decimal) -> Money {
        Money::new(amount, Currency::gbp())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn book() -> Book {
        let mut set = EditSet::new();
        let bank = set.payees.add(Payee::new("Bank", PayeeType::Institution));
        let employer = set.payees.add(Payee::new("Acme", PayeeType::Employer));
        let taxman = set.payees.add(Payee::new("HMRC", PayeeType::TaxMan));
        let market = set.payees.add(Payee::new("Market", PayeeType::Market));

        let current = set.deposits.add(Deposit::new(
            "Current",
            DepositCategory::Checking,
            bank,
            Currency::gbp(),
        ));
        let isa_cash = set.deposits.add(Deposit::new(
            "Cash ISA",
            DepositCategory::TaxFreeSavings,
            bank,
            Currency::gbp(),
        ));
        let usd_account = set.deposits.add(Deposit::new(
            "Dollars",
            DepositCategory::Checking,
            bank,
            Currency::new("USD").unwrap(),
        ));
        let broker_gbp = set.portfolios.add(Portfolio::new(
            "Dealing",
            PortfolioType::Standard,
            bank,
            Currency::gbp(),
        ));
        let shares_a = set.securities.add(Security::new(
            "Alpha",
            SecurityType::Shares,
            market,
            Currency::gbp(),
        ));
        let shares_b = set.securities.add(Security::new(
            "Beta",
            SecurityType::Shares,
            market,
            Currency::gbp(),
        ));

        Book {
            set,
            employer,
            taxman,
            current,
            isa_cash,
            usd_account,
            broker_gbp,
            shares_a,
            shares_b,
        }
    }

    fn holding(b: &Book, security: ItemId) -> AssetRef {
        AssetRef::Holding {
            portfolio: b.broker_gbp,
            security,
        }
    }

    fn errors_of(tx: &Transaction, set: &EditSet) -> ErrorList {
        let mut errors = ErrorList::new();
        tx.validate(ItemId::new(), set, &mut errors);
        errors
    }

    #[test]
    fn test_salary_requires_tax_credit() {
        let b = book();
        let mut salary = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Payee(b.employer),
            TransactionCategory::TaxedIncome,
            Direction::From,
            Some(gbp(dec!(2000))),
        );

        let errors = errors_of(&salary, &b.set);
        assert_eq!(
            errors.for_field(FieldId::Info("TaxCredit")),
            vec!["Required info is missing"]
        );

        salary
            .info
            .set(TransactionInfoClass::TaxCredit, InfoValue::Money(gbp(dec!(400))))
            .unwrap();
        salary
            .info
            .set(TransactionInfoClass::EmployeeNatIns, InfoValue::Money(gbp(dec!(150))))
            .unwrap();
        let errors = errors_of(&salary, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_tax_credit_forbidden_on_tax_free_interest() {
        let b = book();
        let bank_interest = |account: ItemId| {
            let mut tx = Transaction::new(
                date(),
                AssetRef::Deposit(account),
                AssetRef::Payee(b.employer),
                TransactionCategory::Interest,
                Direction::From,
                Some(gbp(dec!(10))),
            );
            tx.info
                .set(TransactionInfoClass::TaxCredit, InfoValue::Money(gbp(dec!(2))))
                .unwrap();
            tx
        };

        assert!(errors_of(&bank_interest(b.current), &b.set).is_empty());
        assert!(errors_of(&bank_interest(b.isa_cash), &b.set)
            .has_field(FieldId::Info("TaxCredit")));
    }

    #[test]
    fn test_income_cannot_go_to_payee_account() {
        let b = book();
        let tx = Transaction::new(
            date(),
            AssetRef::Payee(b.employer),
            AssetRef::Deposit(b.current),
            TransactionCategory::TaxedIncome,
            Direction::From,
            Some(gbp(dec!(1))),
        );
        let errors = errors_of(&tx, &b.set);
        assert!(errors
            .for_field(FieldId::Account)
            .contains(&"Account cannot be a payee"));
    }

    #[test]
    fn test_income_tax_needs_taxman() {
        let b = book();
        let paid = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Payee(b.taxman),
            TransactionCategory::IncomeTax,
            Direction::To,
            Some(gbp(dec!(100))),
        );
        assert!(errors_of(&paid, &b.set).is_empty());

        let wrong = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Payee(b.employer),
            TransactionCategory::IncomeTax,
            Direction::To,
            Some(gbp(dec!(100))),
        );
        assert!(errors_of(&wrong, &b.set).has_field(FieldId::Partner));
    }

    #[test]
    fn test_amount_currency_and_partner_amount() {
        let b = book();
        let mut fx = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Deposit(b.usd_account),
            TransactionCategory::Transfer,
            Direction::To,
            Some(gbp(dec!(100))),
        );
        assert!(errors_of(&fx, &b.set).has_field(FieldId::Info("PartnerAmount")));

        fx.info
            .set(
                TransactionInfoClass::PartnerAmount,
                InfoValue::Money(gbp(dec!(127))),
            )
            .unwrap();
        assert_eq!(
            errors_of(&fx, &b.set).for_field(FieldId::Info("PartnerAmount")),
            vec!["Currency GBP should be USD"]
        );

        fx.amount = Some(Money::new(dec!(100), Currency::new("USD").unwrap()));
        assert!(errors_of(&fx, &b.set).has_field(FieldId::Amount));
    }

    #[test]
    fn test_partner_amount_not_allowed_same_currency() {
        let b = book();
        let mut tx = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Deposit(b.isa_cash),
            TransactionCategory::Transfer,
            Direction::To,
            Some(gbp(dec!(100))),
        );
        tx.info
            .set(TransactionInfoClass::PartnerAmount, InfoValue::Money(gbp(dec!(100))))
            .unwrap();
        assert!(errors_of(&tx, &b.set).has_field(FieldId::Info("PartnerAmount")));
    }

    #[test]
    fn test_stock_split_rules() {
        let b = book();
        let h = holding(&b, b.shares_a);
        let mut split = Transaction::new(
            date(),
            h,
            h,
            TransactionCategory::StockSplit,
            Direction::From,
            None,
        );
        assert_eq!(
            errors_of(&split, &b.set).for_field(FieldId::Info("AccountDeltaUnits")),
            vec!["Required info is missing"]
        );

        split
            .info
            .set(
                TransactionInfoClass::AccountDeltaUnits,
                InfoValue::Units(Units(dec!(100))),
            )
            .unwrap();
        let errors = errors_of(&split, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);

        split.amount = Some(gbp(dec!(5)));
        assert!(errors_of(&split, &b.set).has_field(FieldId::Amount));

        // even a zero amount is refused
        split.amount = Some(gbp(dec!(0)));
        assert_eq!(
            errors_of(&split, &b.set).for_field(FieldId::Amount),
            vec!["StockSplit does not move money"]
        );
    }

    #[test]
    fn test_zero_delta_units_rejected() {
        let b = book();
        let h = holding(&b, b.shares_a);
        let mut split = Transaction::new(
            date(),
            h,
            h,
            TransactionCategory::StockSplit,
            Direction::From,
            None,
        );
        split
            .info
            .set(
                TransactionInfoClass::AccountDeltaUnits,
                InfoValue::Units(Units(dec!(0))),
            )
            .unwrap();
        assert_eq!(
            errors_of(&split, &b.set).for_field(FieldId::Info("AccountDeltaUnits")),
            vec!["Units cannot be zero"]
        );
    }

    #[test]
    fn test_dilution_range_checked() {
        let b = book();
        let mut demerger = Transaction::new(
            date(),
            holding(&b, b.shares_a),
            holding(&b, b.shares_b),
            TransactionCategory::StockDeMerger,
            Direction::To,
            None,
        );
        demerger
            .info
            .set(
                TransactionInfoClass::PartnerDeltaUnits,
                InfoValue::Units(Units(dec!(50))),
            )
            .unwrap();

        for bad in [dec!(0), dec!(1.5), dec!(-0.2)] {
            demerger
                .info
                .set(TransactionInfoClass::Dilution, InfoValue::Ratio(Ratio(bad)))
                .unwrap();
            assert_eq!(
                errors_of(&demerger, &b.set).for_field(FieldId::Info("Dilution")),
                vec!["Dilution must be between 0 and 1"],
                "dilution {}",
                bad
            );
        }

        demerger
            .info
            .set(TransactionInfoClass::Dilution, InfoValue::Ratio(Ratio(dec!(1))))
            .unwrap();
        assert!(errors_of(&demerger, &b.set).is_empty());
    }

    fn life_bond_gain(b: &mut Book) -> Transaction {
        let bond = b.set.securities.add(Security::new(
            "Bond",
            SecurityType::LifeBond,
            b.employer,
            Currency::gbp(),
        ));
        Transaction::new(
            date(),
            holding(b, bond),
            AssetRef::Deposit(b.current),
            TransactionCategory::ChargeableGain,
            Direction::From,
            Some(gbp(dec!(800))),
        )
    }

    #[test]
    fn test_chargeable_gain_qualify_years() {
        let mut b = book();
        let mut gain = life_bond_gain(&mut b);
        assert_eq!(
            errors_of(&gain, &b.set).for_field(FieldId::Info("QualifyYears")),
            vec!["Required info is missing"]
        );

        for bad in [0, 51, -3] {
            gain.info
                .set(TransactionInfoClass::QualifyYears, InfoValue::Integer(bad))
                .unwrap();
            assert_eq!(
                errors_of(&gain, &b.set).for_field(FieldId::Info("QualifyYears")),
                vec!["Qualifying years must be between 1 and 50"]
            );
        }

        for good in [1, 50] {
            gain.info
                .set(TransactionInfoClass::QualifyYears, InfoValue::Integer(good))
                .unwrap();
            let errors = errors_of(&gain, &b.set);
            assert!(errors.is_empty(), "{:?}", errors);
        }
    }

    #[test]
    fn test_chargeable_gain_shape() {
        let mut b = book();
        let mut gain = life_bond_gain(&mut b);
        gain.info
            .set(TransactionInfoClass::QualifyYears, InfoValue::Integer(5))
            .unwrap();

        // only a life bond holding can carry the gain
        let mut shares = gain.clone();
        shares.account = holding(&b, b.shares_a);
        assert!(errors_of(&shares, &b.set).has_field(FieldId::Account));

        // and it must be paid to a deposit or cash account
        let mut to_payee = gain.clone();
        to_payee.partner = AssetRef::Payee(b.employer);
        assert!(errors_of(&to_payee, &b.set).has_field(FieldId::Partner));

        let mut to_portfolio = gain.clone();
        to_portfolio.partner = AssetRef::Portfolio(b.broker_gbp);
        assert!(errors_of(&to_portfolio, &b.set).has_field(FieldId::Partner));

        let errors = errors_of(&gain, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_units_adjust_may_be_negative() {
        let b = book();
        let h = holding(&b, b.shares_a);
        let mut adjust = Transaction::new(
            date(),
            h,
            h,
            TransactionCategory::UnitsAdjust,
            Direction::To,
            None,
        );
        adjust
            .info
            .set(
                TransactionInfoClass::AccountDeltaUnits,
                InfoValue::Units(Units(dec!(-3))),
            )
            .unwrap();
        assert!(errors_of(&adjust, &b.set).is_empty());
    }

    #[test]
    fn test_demerger_needs_dilution_and_partner_units() {
        let b = book();
        let mut demerger = Transaction::new(
            date(),
            holding(&b, b.shares_a),
            holding(&b, b.shares_b),
            TransactionCategory::StockDeMerger,
            Direction::To,
            None,
        );
        let errors = errors_of(&demerger, &b.set);
        assert!(errors.has_field(FieldId::Info("Dilution")));
        assert!(errors.has_field(FieldId::Info("PartnerDeltaUnits")));

        demerger
            .info
            .set(TransactionInfoClass::Dilution, InfoValue::Ratio(Ratio(dec!(0.8))))
            .unwrap();
        demerger
            .info
            .set(
                TransactionInfoClass::PartnerDeltaUnits,
                InfoValue::Units(Units(dec!(50))),
            )
            .unwrap();
        let errors = errors_of(&demerger, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_takeover_returned_cash() {
        let b = book();
        let mut takeover = Transaction::new(
            date(),
            holding(&b, b.shares_a),
            holding(&b, b.shares_b),
            TransactionCategory::StockTakeOver,
            Direction::To,
            Some(gbp(dec!(1000))),
        );
        takeover
            .info
            .set(
                TransactionInfoClass::PartnerDeltaUnits,
                InfoValue::Units(Units(dec!(20))),
            )
            .unwrap();
        takeover
            .info
            .set(
                TransactionInfoClass::ReturnedCashAccount,
                InfoValue::Link(b.current),
            )
            .unwrap();

        let errors = errors_of(&takeover, &b.set);
        assert_eq!(
            errors.for_field(FieldId::Info("ReturnedCash")),
            vec!["Required info is missing"]
        );

        takeover
            .info
            .set(TransactionInfoClass::ReturnedCash, InfoValue::Money(gbp(dec!(12.50))))
            .unwrap();
        let errors = errors_of(&takeover, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_buying_units_with_price() {
        let b = book();
        let mut buy = Transaction::new(
            date(),
            holding(&b, b.shares_a),
            AssetRef::Deposit(b.current),
            TransactionCategory::Transfer,
            Direction::From,
            Some(gbp(dec!(500))),
        );
        buy.info
            .set(
                TransactionInfoClass::AccountDeltaUnits,
                InfoValue::Units(Units(dec!(100))),
            )
            .unwrap();
        buy.info
            .set(
                TransactionInfoClass::Price,
                InfoValue::Price(Price(gbp(dec!(5)))),
            )
            .unwrap();
        let errors = errors_of(&buy, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);

        // selling: value leaves the holding, units may not be added
        buy.direction = Direction::To;
        assert!(errors_of(&buy, &b.set).has_field(FieldId::Info("AccountDeltaUnits")));
    }

    #[test]
    fn test_price_follows_partner_holding() {
        let b = book();
        let mut buy = Transaction::new(
            date(),
            AssetRef::Deposit(b.usd_account),
            holding(&b, b.shares_a),
            TransactionCategory::Transfer,
            Direction::To,
            Some(Money::new(dec!(630), Currency::new("USD").unwrap())),
        );
        buy.info
            .set(
                TransactionInfoClass::PartnerAmount,
                InfoValue::Money(gbp(dec!(500))),
            )
            .unwrap();
        buy.info
            .set(
                TransactionInfoClass::PartnerDeltaUnits,
                InfoValue::Units(Units(dec!(100))),
            )
            .unwrap();
        buy.info
            .set(
                TransactionInfoClass::Price,
                InfoValue::Price(Price(gbp(dec!(5)))),
            )
            .unwrap();
        let errors = errors_of(&buy, &b.set);
        assert!(errors.is_empty(), "{:?}", errors);

        buy.info
            .set(
                TransactionInfoClass::Price,
                InfoValue::Price(Price(Money::new(dec!(6.30), Currency::new("USD").unwrap()))),
            )
            .unwrap();
        assert_eq!(
            errors_of(&buy, &b.set).for_field(FieldId::Info("Price")),
            vec!["Currency USD should be GBP"]
        );
    }

    #[test]
    fn test_closed_account_requires_reconciled() {
        let mut b = book();
        b.set
            .deposits
            .update(b.current, |d| d.closed = true)
            .unwrap();

        let mut expense = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Payee(b.employer),
            TransactionCategory::Expense,
            Direction::To,
            Some(gbp(dec!(5))),
        );
        assert_eq!(
            errors_of(&expense, &b.set).for_field(FieldId::Account),
            vec!["Account is closed"]
        );

        expense.reconciled = true;
        assert!(errors_of(&expense, &b.set).is_empty());
    }

    #[test]
    fn test_refund_detection() {
        let b = book();
        let refund = Transaction::new(
            date(),
            AssetRef::Deposit(b.current),
            AssetRef::Payee(b.employer),
            TransactionCategory::Expense,
            Direction::From,
            Some(gbp(dec!(5))),
        );
        assert!(refund.is_refund());
        assert_eq!(refund.tax_year(TaxYearStart::default()).ending_year(), 2025);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "stockdemerger".parse::<TransactionCategory>().unwrap(),
            TransactionCategory::StockDeMerger
        );
        assert!("Salary".parse::<TransactionCategory>().is_err());
        assert_eq!("FROM".parse::<Direction>().unwrap(), Direction::From);
    }
}
