// 📄 Book Documents - JSON books and CSV transaction registers
//
// A book document refers to everything BY NAME. Loading it builds an edit
// set of committed items, resolving names to ids as it goes. Problems with
// single entries (unknown names, badly typed info values) are collected as
// issues rather than aborting the load.
//
// Transaction sides are account names; a holding is "Portfolio:Security".

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::editset::EditSet;
use crate::entities::{
    AccountInfoClass, AssetRef, Cash, Deposit, Direction, Loan, Payee, Portfolio, Security,
    Transaction, TransactionCategory, TransactionInfoClass,
};
use crate::error::{MoneyWiseError, Result};
use crate::infoset::{InfoClass, InfoDataType, InfoSet, InfoValue};
use crate::item::ItemId;
use crate::money::{Currency, Money, Price, Ratio, Units};

// ============================================================================
// DOCUMENT MODEL
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookDocument {
    pub payees: Vec<EntryDoc>,
    pub deposits: Vec<EntryDoc>,
    pub cash: Vec<EntryDoc>,
    pub loans: Vec<EntryDoc>,
    pub portfolios: Vec<EntryDoc>,
    pub securities: Vec<EntryDoc>,
    pub transactions: Vec<TransactionDoc>,
}

/// A payee, account or security. Payees ignore parent and currency.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryDoc {
    pub name: String,
    pub desc: Option<String>,
    pub category: String,
    pub parent: Option<String>,
    pub currency: Option<String>,
    pub closed: bool,
    pub info: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDoc {
    pub date: NaiveDate,
    pub account: String,
    pub partner: String,
    pub category: String,
    pub direction: Direction,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reconciled: bool,
    #[serde(default)]
    pub info: BTreeMap<String, Value>,
}

/// One entry that could not be loaded as written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentIssue {
    pub section: &'static str,
    pub entry: String,
    pub message: String,
}

impl DocumentIssue {
    fn new(section: &'static str, entry: impl Into<String>, message: impl fmt::Display) -> Self {
        DocumentIssue {
            section,
            entry: entry.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for DocumentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.section, self.entry, self.message)
    }
}

#[derive(Debug)]
pub struct LoadedBook {
    pub set: EditSet,
    pub issues: Vec<DocumentIssue>,
}

// ============================================================================
// LOADING
// ============================================================================

impl BookDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        debug!("Read book document {}", path.as_ref().display());
        Self::from_json(&content)
    }

    /// Build an edit set from the document. Parents come first so that
    /// every later name can be resolved against what is already loaded.
    pub fn load(&self, config: &Config) -> LoadedBook {
        let mut set = EditSet::from_config(config);
        let mut issues = Vec::new();
        let default = &config.reporting_currency;

        for entry in &self.payees {
            let info = account_info("payee", entry, default, &set, &HashMap::new(), &mut issues);
            let built = entry.category.parse().map(|category| Payee {
                name: entry.name.clone(),
                desc: entry.desc.clone(),
                category,
                closed: entry.closed,
                info,
            });
            match built {
                Ok(payee) => {
                    set.payees.insert_committed(ItemId::new(), payee);
                }
                Err(err) => issues.push(DocumentIssue::new("payee", &entry.name, err)),
            }
        }

        for entry in &self.deposits {
            let built = common("deposit", entry, config, &set, &HashMap::new(), &mut issues)
                .and_then(|(parent, currency, info)| {
                    Ok(Deposit {
                        name: entry.name.clone(),
                        desc: entry.desc.clone(),
                        category: entry.category.parse()?,
                        parent,
                        currency,
                        closed: entry.closed,
                        info,
                    })
                });
            match built {
                Ok(deposit) => {
                    set.deposits.insert_committed(ItemId::new(), deposit);
                }
                Err(err) => issues.push(DocumentIssue::new("deposit", &entry.name, err)),
            }
        }

        for entry in &self.cash {
            let built = common("cash", entry, config, &set, &HashMap::new(), &mut issues).and_then(
                |(_, currency, info)| {
                    Ok(Cash {
                        name: entry.name.clone(),
                        desc: entry.desc.clone(),
                        category: entry.category.parse()?,
                        currency,
                        closed: entry.closed,
                        info,
                    })
                },
            );
            match built {
                Ok(cash) => {
                    set.cash.insert_committed(ItemId::new(), cash);
                }
                Err(err) => issues.push(DocumentIssue::new("cash", &entry.name, err)),
            }
        }

        for entry in &self.loans {
            let built = common("loan", entry, config, &set, &HashMap::new(), &mut issues)
                .and_then(|(parent, currency, info)| {
                    Ok(Loan {
                        name: entry.name.clone(),
                        desc: entry.desc.clone(),
                        category: entry.category.parse()?,
                        parent,
                        currency,
                        closed: entry.closed,
                        info,
                    })
                });
            match built {
                Ok(loan) => {
                    set.loans.insert_committed(ItemId::new(), loan);
                }
                Err(err) => issues.push(DocumentIssue::new("loan", &entry.name, err)),
            }
        }

        for entry in &self.portfolios {
            let built = common("portfolio", entry, config, &set, &HashMap::new(), &mut issues)
                .and_then(|(parent, currency, info)| {
                    Ok(Portfolio {
                        name: entry.name.clone(),
                        desc: entry.desc.clone(),
                        category: entry.category.parse()?,
                        parent,
                        currency,
                        closed: entry.closed,
                        info,
                    })
                });
            match built {
                Ok(portfolio) => {
                    set.portfolios.insert_committed(ItemId::new(), portfolio);
                }
                Err(err) => issues.push(DocumentIssue::new("portfolio", &entry.name, err)),
            }
        }

        // securities may link to each other, so their ids are handed out first
        let security_ids: Vec<ItemId> = self.securities.iter().map(|_| ItemId::new()).collect();
        let mut by_name: HashMap<String, ItemId> = HashMap::new();
        for (entry, id) in self.securities.iter().zip(&security_ids) {
            by_name.entry(entry.name.to_lowercase()).or_insert(*id);
        }
        for (entry, id) in self.securities.iter().zip(security_ids) {
            let built = common("security", entry, config, &set, &by_name, &mut issues)
                .and_then(|(parent, currency, info)| {
                    Ok(Security {
                        name: entry.name.clone(),
                        desc: entry.desc.clone(),
                        category: entry.category.parse()?,
                        parent,
                        currency,
                        closed: entry.closed,
                        info,
                    })
                });
            match built {
                Ok(security) => {
                    set.securities.insert_committed(id, security);
                }
                Err(err) => issues.push(DocumentIssue::new("security", &entry.name, err)),
            }
        }

        for doc in &self.transactions {
            let label = format!("{} {}", doc.date, doc.account);
            match build_transaction(doc, &label, config, &set, &mut issues) {
                Ok(tx) => {
                    set.transactions.insert_committed(ItemId::new(), tx);
                }
                Err(err) => issues.push(DocumentIssue::new("transaction", label, err)),
            }
        }

        for issue in &issues {
            warn!("{}", issue);
        }
        info!(
            payees = set.payees.count(),
            transactions = set.transactions.count(),
            issues = issues.len(),
            "Book loaded"
        );
        LoadedBook { set, issues }
    }
}

/// Parent, currency and info shared by every account-like entry
fn common(
    section: &'static str,
    entry: &EntryDoc,
    config: &Config,
    set: &EditSet,
    securities: &HashMap<String, ItemId>,
    issues: &mut Vec<DocumentIssue>,
) -> Result<(Option<ItemId>, Currency, InfoSet<AccountInfoClass>)> {
    let currency = match &entry.currency {
        Some(code) => Currency::new(code)?,
        None => config.reporting_currency.clone(),
    };

    let parent = entry.parent.as_deref().and_then(|name| {
        let found = set.payees.find_by_name(name).map(|p| p.id());
        if found.is_none() {
            issues.push(DocumentIssue::new(
                section,
                &entry.name,
                MoneyWiseError::UnknownName {
                    kind: "parent payee",
                    value: name.to_string(),
                },
            ));
        }
        found
    });

    let info = account_info(section, entry, &currency, set, securities, issues);
    Ok((parent, currency, info))
}

fn account_info(
    section: &'static str,
    entry: &EntryDoc,
    currency: &Currency,
    set: &EditSet,
    securities: &HashMap<String, ItemId>,
    issues: &mut Vec<DocumentIssue>,
) -> InfoSet<AccountInfoClass> {
    let mut info = InfoSet::new();
    for (key, raw) in &entry.info {
        let Some(class) = AccountInfoClass::from_name(key) else {
            issues.push(DocumentIssue::new(
                section,
                &entry.name,
                format!("Unknown info class '{}'", key),
            ));
            continue;
        };
        let resolve = |name: &str| match class {
            AccountInfoClass::AutoPayee => set.payees.find_by_name(name).map(|p| p.id()),
            AccountInfoClass::UnderlyingStock => securities.get(&name.to_lowercase()).copied(),
            _ => None,
        };
        let stored = convert(class.data_type(), raw, currency, &resolve)
            .and_then(|value| info.set(class, value));
        if let Err(err) = stored {
            issues.push(DocumentIssue::new(
                section,
                &entry.name,
                format!("{}: {}", class.name(), err),
            ));
        }
    }
    info
}

fn build_transaction(
    doc: &TransactionDoc,
    label: &str,
    config: &Config,
    set: &EditSet,
    issues: &mut Vec<DocumentIssue>,
) -> Result<Transaction> {
    let account = resolve_asset(set, &doc.account)?;
    let partner = resolve_asset(set, &doc.partner)?;
    let category: TransactionCategory = doc.category.parse()?;

    let currency_of = |side: AssetRef| {
        set.asset(side)
            .ok()
            .and_then(|view| view.currency)
            .unwrap_or_else(|| config.reporting_currency.clone())
    };
    let account_currency = currency_of(account);
    let partner_currency = currency_of(partner);

    let mut tx = Transaction::new(
        doc.date,
        account,
        partner,
        category,
        doc.direction,
        doc.amount.map(|a| Money::new(a, account_currency.clone())),
    );
    tx.reconciled = doc.reconciled;

    let returned_deposit = |name: &str| set.deposits.find_by_name(name);
    let returned_currency = doc
        .info
        .iter()
        .find(|(key, _)| {
            TransactionInfoClass::from_name(key) == Some(TransactionInfoClass::ReturnedCashAccount)
        })
        .and_then(|(_, raw)| raw.as_str())
        .and_then(returned_deposit)
        .map(|d| d.values().currency.clone())
        .unwrap_or_else(|| account_currency.clone());

    for (key, raw) in &doc.info {
        let Some(class) = TransactionInfoClass::from_name(key) else {
            issues.push(DocumentIssue::new(
                "transaction",
                label,
                format!("Unknown info class '{}'", key),
            ));
            continue;
        };
        let currency = match class {
            TransactionInfoClass::PartnerAmount => &partner_currency,
            TransactionInfoClass::ReturnedCash => &returned_currency,
            _ => &account_currency,
        };
        let resolve = |name: &str| returned_deposit(name).map(|d| d.id());
        let stored = convert(class.data_type(), raw, currency, &resolve)
            .and_then(|value| tx.info.set(class, value));
        if let Err(err) = stored {
            issues.push(DocumentIssue::new(
                "transaction",
                label,
                format!("{}: {}", class.name(), err),
            ));
        }
    }
    Ok(tx)
}

/// Resolve a transaction side by name ("Portfolio:Security" for holdings)
pub fn resolve_asset(set: &EditSet, name: &str) -> Result<AssetRef> {
    let unknown = |kind: &'static str, value: &str| MoneyWiseError::UnknownName {
        kind,
        value: value.to_string(),
    };

    if let Some((portfolio, security)) = name.split_once(':') {
        let portfolio = set
            .portfolios
            .find_by_name(portfolio.trim())
            .ok_or_else(|| unknown("portfolio", portfolio))?;
        let security = set
            .securities
            .find_by_name(security.trim())
            .ok_or_else(|| unknown("security", security))?;
        return Ok(AssetRef::Holding {
            portfolio: portfolio.id(),
            security: security.id(),
        });
    }

    let name = name.trim();
    let found: Vec<AssetRef> = [
        set.deposits.find_by_name(name).map(|i| AssetRef::Deposit(i.id())),
        set.cash.find_by_name(name).map(|i| AssetRef::Cash(i.id())),
        set.loans.find_by_name(name).map(|i| AssetRef::Loan(i.id())),
        set.portfolios.find_by_name(name).map(|i| AssetRef::Portfolio(i.id())),
        set.payees.find_by_name(name).map(|i| AssetRef::Payee(i.id())),
    ]
    .into_iter()
    .flatten()
    .collect();

    match found.as_slice() {
        [] => Err(unknown("account", name)),
        [one] => Ok(*one),
        _ => Err(MoneyWiseError::Document(format!(
            "Ambiguous account name '{}'",
            name
        ))),
    }
}

// ============================================================================
// VALUE CONVERSION
// ============================================================================

fn decimal(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// A bare amount is in the default currency; an object may name its own
fn money(raw: &Value, default: &Currency) -> Result<Money> {
    let (amount, currency) = match raw {
        Value::Object(map) => {
            let currency = match map.get("currency").and_then(Value::as_str) {
                Some(code) => Currency::new(code)?,
                None => default.clone(),
            };
            (map.get("amount").and_then(decimal), currency)
        }
        other => (decimal(other), default.clone()),
    };
    amount
        .map(|a| Money::new(a, currency))
        .ok_or_else(|| MoneyWiseError::Document(format!("'{}' is not an amount", raw)))
}

fn convert(
    data_type: InfoDataType,
    raw: &Value,
    currency: &Currency,
    resolve: &dyn Fn(&str) -> Option<ItemId>,
) -> Result<InfoValue> {
    let invalid = || {
        MoneyWiseError::Document(format!(
            "expected {} value, found {}",
            data_type.as_str(),
            raw
        ))
    };

    let value = match data_type {
        InfoDataType::Text => InfoValue::Text(raw.as_str().ok_or_else(invalid)?.to_string()),
        InfoDataType::Money => InfoValue::Money(money(raw, currency)?),
        InfoDataType::Units => InfoValue::Units(Units(decimal(raw).ok_or_else(invalid)?)),
        InfoDataType::Price => InfoValue::Price(Price(money(raw, currency)?)),
        InfoDataType::Ratio => InfoValue::Ratio(Ratio(decimal(raw).ok_or_else(invalid)?)),
        InfoDataType::Date => InfoValue::Date(
            raw.as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .ok_or_else(invalid)?,
        ),
        InfoDataType::Integer => InfoValue::Integer(raw.as_i64().ok_or_else(invalid)?),
        InfoDataType::Link => {
            let name = raw.as_str().ok_or_else(invalid)?;
            InfoValue::Link(resolve(name).ok_or_else(|| MoneyWiseError::UnknownName {
                kind: "link",
                value: name.to_string(),
            })?)
        }
        InfoDataType::Tags => InfoValue::Tags(
            raw.as_array()
                .ok_or_else(invalid)?
                .iter()
                .map(|tag| tag.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<BTreeSet<String>>>()?,
        ),
    };
    Ok(value)
}

// ============================================================================
// CSV REGISTER IMPORT
// ============================================================================

/// Columns: date,account,partner,category,direction,amount,reference
#[derive(Debug, Deserialize)]
struct RegisterRow {
    date: NaiveDate,
    account: String,
    partner: String,
    category: String,
    direction: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    reference: String,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub issues: Vec<DocumentIssue>,
}

/// Add every row of a register to the set as a new transaction
pub fn import_register<R: io::Read>(
    set: &mut EditSet,
    config: &Config,
    reader: R,
) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    for (line_num, result) in reader.deserialize::<RegisterRow>().enumerate() {
        // 1-indexed plus the header row
        let line = format!("line {}", line_num + 2);
        let built = result
            .map_err(MoneyWiseError::from)
            .and_then(|row| register_transaction(&row, config, set));
        match built {
            Ok(tx) => {
                set.transactions.add(tx);
                summary.imported += 1;
            }
            Err(err) => summary
                .issues
                .push(DocumentIssue::new("register", line, err)),
        }
    }

    info!(
        imported = summary.imported,
        issues = summary.issues.len(),
        "Register imported"
    );
    Ok(summary)
}

pub fn import_register_file<P: AsRef<Path>>(
    set: &mut EditSet,
    config: &Config,
    path: P,
) -> Result<ImportSummary> {
    let file = fs::File::open(path.as_ref())?;
    import_register(set, config, file)
}

fn register_transaction(row: &RegisterRow, config: &Config, set: &EditSet) -> Result<Transaction> {
    let account = resolve_asset(set, &row.account)?;
    let partner = resolve_asset(set, &row.partner)?;
    let currency = set
        .asset(account)
        .ok()
        .and_then(|view| view.currency)
        .unwrap_or_else(|| config.reporting_currency.clone());

    let amount = if row.amount.is_empty() {
        None
    } else {
        Some(Money::parse(&row.amount, &currency)?)
    };

    let mut tx = Transaction::new(
        row.date,
        account,
        partner,
        row.category.parse()?,
        row.direction.parse()?,
        amount,
    );
    if !row.reference.is_empty() {
        tx.info.set(
            TransactionInfoClass::Reference,
            InfoValue::Text(row.reference.clone()),
        )?;
    }
    Ok(tx)
}

// ============================================================================
// TESTS
// ============================================================================
