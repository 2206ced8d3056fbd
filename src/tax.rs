// 🧮 Tax Years - bucket income and tax paid by tax year
//
// A tax year is named by the calendar year its last day falls in. With the
// default start of 6 April, 2024-05-01 lies in the year ending 2025.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::config::Config;
use crate::editset::EditSet;
use crate::entities::{Transaction, TransactionCategory, TransactionInfoClass};
use crate::error::{MoneyWiseError, Result};
use crate::money::{Currency, Money};

// ============================================================================
// TAX YEAR
// ============================================================================

/// First day of every tax year (month, day)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearStart {
    pub month: u32,
    pub day: u32,
}

impl TaxYearStart {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        let start = TaxYearStart { month, day };
        start.check()?;
        Ok(start)
    }

    /// The start must exist in every year, so 29 February is refused
    pub fn check(&self) -> Result<()> {
        match NaiveDate::from_ymd_opt(2023, self.month, self.day) {
            Some(_) => Ok(()),
            None => Err(MoneyWiseError::InvalidConfig(format!(
                "tax year start {}/{} is not a valid day",
                self.day, self.month
            ))),
        }
    }

    fn in_year(&self, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, 4, 6))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl Default for TaxYearStart {
    fn default() -> Self {
        TaxYearStart { month: 4, day: 6 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaxYear {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TaxYear {
    pub fn for_date(date: NaiveDate, start: TaxYearStart) -> Self {
        let this_year = start.in_year(date.year());
        let first = if date >= this_year {
            this_year
        } else {
            start.in_year(date.year() - 1)
        };
        let next = start.in_year(first.year() + 1);
        TaxYear {
            start: first,
            end: next - Duration::days(1),
        }
    }

    pub fn ending_year(&self) -> i32 {
        self.end.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for TaxYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.year() == self.end.year() {
            write!(f, "{}", self.end.year())
        } else {
            write!(f, "{}/{:02}", self.start.year(), self.end.year() % 100)
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TaxBucket {
    Salary,
    Interest,
    TaxFreeInterest,
    Dividend,
    TaxFreeDividend,
    RentalIncome,
    ChargeableGains,
    OtherIncome,
    TaxPaid,
    NationalInsurance,
    NonTaxableIncome,
}

impl TaxBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxBucket::Salary => "Salary",
            TaxBucket::Interest => "Interest",
            TaxBucket::TaxFreeInterest => "TaxFreeInterest",
            TaxBucket::Dividend => "Dividend",
            TaxBucket::TaxFreeDividend => "TaxFreeDividend",
            TaxBucket::RentalIncome => "RentalIncome",
            TaxBucket::ChargeableGains => "ChargeableGains",
            TaxBucket::OtherIncome => "OtherIncome",
            TaxBucket::TaxPaid => "TaxPaid",
            TaxBucket::NationalInsurance => "NationalInsurance",
            TaxBucket::NonTaxableIncome => "NonTaxableIncome",
        }
    }

    /// Buckets that make up taxable income
    pub fn is_taxable(&self) -> bool {
        matches!(
            self,
            TaxBucket::Salary
                | TaxBucket::Interest
                | TaxBucket::Dividend
                | TaxBucket::RentalIncome
                | TaxBucket::ChargeableGains
                | TaxBucket::OtherIncome
        )
    }
}

/// Totals for one tax year in the reporting currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxYearSummary {
    pub year: TaxYear,
    pub currency: Currency,
    pub buckets: BTreeMap<TaxBucket, Decimal>,
    pub transactions: usize,
    /// Transactions left out: not in the reporting currency, or totals out
    /// of range
    pub skipped: usize,
}

impl TaxYearSummary {
    pub fn new(year: TaxYear, currency: Currency) -> Self {
        TaxYearSummary {
            year,
            currency,
            buckets: BTreeMap::new(),
            transactions: 0,
            skipped: 0,
        }
    }

    pub fn get(&self, bucket: TaxBucket) -> Decimal {
        self.buckets.get(&bucket).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of the taxable buckets
    pub fn taxable_income(&self) -> Result<Decimal> {
        self.buckets
            .iter()
            .filter(|(bucket, _)| bucket.is_taxable())
            .try_fold(Decimal::ZERO, |total, (_, amount)| total.checked_add(*amount))
            .ok_or_else(|| MoneyWiseError::AmountOverflow(format!("taxable income {}", self.year)))
    }

    /// Add one transaction to the buckets. Returns false when its category
    /// is not counted. A total out of range leaves the summary unchanged.
    fn add_transaction(
        &mut self,
        tx: &Transaction,
        amount: Decimal,
        tax_free: bool,
    ) -> Result<bool> {
        let parts = self.contributions(tx, amount, tax_free)?;
        if parts.is_empty() {
            return Ok(false);
        }

        let mut staged = self.buckets.clone();
        for (bucket, value) in parts {
            if value.is_zero() {
                continue;
            }
            let total = staged.get(&bucket).copied().unwrap_or(Decimal::ZERO);
            let total = total
                .checked_add(value)
                .ok_or_else(|| out_of_range(bucket))?;
            staged.insert(bucket, total);
        }
        self.buckets = staged;
        self.transactions += 1;
        Ok(true)
    }

    /// What one transaction adds to each bucket
    fn contributions(
        &self,
        tx: &Transaction,
        amount: Decimal,
        tax_free: bool,
    ) -> Result<Vec<(TaxBucket, Decimal)>> {
        use TransactionCategory::*;

        let sign = if tx.is_refund() { -Decimal::ONE } else { Decimal::ONE };
        let info = |class| {
            tx.info_money(class)
                .filter(|m| m.currency == self.currency)
                .map_or(Decimal::ZERO, |m: &Money| m.amount)
        };
        // gross figures add several amounts, each of which may be near the limit
        let gross = |bucket: TaxBucket, values: &[Decimal]| {
            values
                .iter()
                .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value))
                .map(|total| sign * total)
                .ok_or_else(|| out_of_range(bucket))
        };
        let credit = info(TransactionInfoClass::TaxCredit);

        let parts = match tx.category {
            TaxedIncome => {
                let ni = info(TransactionInfoClass::EmployeeNatIns);
                let withheld = info(TransactionInfoClass::Withheld);
                vec![
                    (
                        TaxBucket::Salary,
                        gross(TaxBucket::Salary, &[amount, credit, ni, withheld])?,
                    ),
                    (TaxBucket::TaxPaid, sign * credit),
                    (TaxBucket::NationalInsurance, sign * ni),
                ]
            }
            BenefitIncome => vec![
                (
                    TaxBucket::Salary,
                    sign * info(TransactionInfoClass::DeemedBenefit),
                ),
                (TaxBucket::NonTaxableIncome, sign * amount),
            ],
            Interest if tax_free => vec![(TaxBucket::TaxFreeInterest, sign * amount)],
            Dividend if tax_free => vec![(TaxBucket::TaxFreeDividend, sign * amount)],
            Interest | Dividend | RentalIncome => {
                let bucket = match tx.category {
                    Interest => TaxBucket::Interest,
                    Dividend => TaxBucket::Dividend,
                    _ => TaxBucket::RentalIncome,
                };
                vec![
                    (bucket, gross(bucket, &[amount, credit])?),
                    (TaxBucket::TaxPaid, sign * credit),
                ]
            }
            OtherIncome => vec![(TaxBucket::OtherIncome, sign * amount)],
            GrantIncome | GiftedIncome | Inheritance | LoyaltyBonus | CashBack => {
                vec![(TaxBucket::NonTaxableIncome, sign * amount)]
            }
            ChargeableGain => vec![(TaxBucket::ChargeableGains, sign * amount)],
            IncomeTax => vec![(TaxBucket::TaxPaid, sign * amount)],
            TaxRefund => vec![(TaxBucket::TaxPaid, -sign * amount)],
            _ => Vec::new(),
        };
        Ok(parts)
    }
}

fn out_of_range(bucket: TaxBucket) -> MoneyWiseError {
    MoneyWiseError::AmountOverflow(format!("{} total", bucket.as_str()))
}

/// Build one summary per tax year touched by the live transactions
pub fn summarise(set: &EditSet, config: &Config) -> Vec<TaxYearSummary> {
    let mut years: BTreeMap<TaxYear, TaxYearSummary> = BTreeMap::new();

    for item in set.transactions.iter() {
        let tx = item.values();
        let Some(amount) = &tx.amount else {
            continue;
        };

        let year = tx.tax_year(config.tax_year_start);
        let summary = years
            .entry(year)
            .or_insert_with(|| TaxYearSummary::new(year, config.reporting_currency.clone()));

        if amount.currency != config.reporting_currency {
            warn!(
                "Skipping transaction {} in {} for tax year {}",
                item.id(),
                amount.currency,
                year
            );
            summary.skipped += 1;
            continue;
        }

        let tax_free = set.asset(tx.account).map_or(false, |view| view.tax_free);
        if let Err(err) = summary.add_transaction(tx, amount.amount, tax_free) {
            warn!(
                "Skipping transaction {} for tax year {}: {}",
                item.id(),
                year,
                err
            );
            summary.skipped += 1;
        }
    }

    years.into_values().collect()
}

// ============================================================================
// TESTS
// ============================================================================
