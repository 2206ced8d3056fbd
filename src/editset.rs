// 🗂️ Edit Set - every list of the book plus the holding map
//
// Validation runs in two phases per list: items are checked against a shared
// borrow of the whole set, then the results (plus the list-level name and
// singular-category checks) are stored on the items.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::entities::{
    AccountInfoClass, AssetClass, AssetRef, Cash, Deposit, Loan, Payee, PayeeType, Portfolio,
    Security, SecurityType, Transaction, TransactionInfoClass,
};
use crate::error::Result;
use crate::holdings::{SecurityHolding, SecurityHoldingMap};
use crate::infoset::InfoClass;
use crate::item::versioned::DEFAULT_MAX_HISTORY;
use crate::item::{DataItem, DataList, FieldId, ItemId};
use crate::money::Currency;
use crate::tax::{self, TaxYearSummary};
use crate::validation::{ErrorList, ValidationReport};

/// What a transaction needs to know about one of its sides
#[derive(Debug, Clone)]
pub struct AssetView {
    pub class: AssetClass,
    /// None for payees
    pub currency: Option<Currency>,
    pub closed: bool,
    pub tax_free: bool,
    pub payee_type: Option<PayeeType>,
    pub security_type: Option<SecurityType>,
    pub holding: Option<Arc<SecurityHolding>>,
}

impl AssetView {
    fn account(class: AssetClass, currency: &Currency, closed: bool, tax_free: bool) -> Self {
        AssetView {
            class,
            currency: Some(currency.clone()),
            closed,
            tax_free,
            payee_type: None,
            security_type: None,
            holding: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct EditSet {
    pub payees: DataList<Payee>,
    pub deposits: DataList<Deposit>,
    pub cash: DataList<Cash>,
    pub loans: DataList<Loan>,
    pub portfolios: DataList<Portfolio>,
    pub securities: DataList<Security>,
    pub transactions: DataList<Transaction>,
    pub holdings: SecurityHoldingMap,
}

impl EditSet {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        EditSet {
            payees: DataList::new().with_max_history(max_history),
            deposits: DataList::new().with_max_history(max_history),
            cash: DataList::new().with_max_history(max_history),
            loans: DataList::new().with_max_history(max_history),
            portfolios: DataList::new().with_max_history(max_history),
            securities: DataList::new().with_max_history(max_history),
            transactions: DataList::new().with_max_history(max_history),
            holdings: SecurityHoldingMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_max_history(config.max_history)
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    /// Number of open, live accounts and securities owned by a payee
    pub fn open_children_of(&self, payee: ItemId) -> usize {
        let owned = |parent: Option<ItemId>, closed: bool| parent == Some(payee) && !closed;

        self.deposits
            .iter()
            .filter(|i| owned(i.values().parent, i.values().closed))
            .count()
            + self
                .loans
                .iter()
                .filter(|i| owned(i.values().parent, i.values().closed))
                .count()
            + self
                .portfolios
                .iter()
                .filter(|i| owned(i.values().parent, i.values().closed))
                .count()
            + self
                .securities
                .iter()
                .filter(|i| owned(i.values().parent, i.values().closed))
                .count()
    }

    /// Resolve one side of a transaction. Holdings are allocated on demand.
    pub fn asset(&self, asset: AssetRef) -> Result<AssetView> {
        let view = match asset {
            AssetRef::Payee(id) => {
                let payee = self.payees.live(id)?.values();
                AssetView {
                    class: AssetClass::Payee,
                    currency: None,
                    closed: payee.closed,
                    tax_free: false,
                    payee_type: Some(payee.category),
                    security_type: None,
                    holding: None,
                }
            }
            AssetRef::Deposit(id) => {
                let d = self.deposits.live(id)?.values();
                AssetView::account(
                    AssetClass::Deposit,
                    &d.currency,
                    d.closed,
                    d.category.is_tax_free(),
                )
            }
            AssetRef::Cash(id) => {
                let c = self.cash.live(id)?.values();
                AssetView::account(AssetClass::Cash, &c.currency, c.closed, false)
            }
            AssetRef::Loan(id) => {
                let l = self.loans.live(id)?.values();
                AssetView::account(AssetClass::Loan, &l.currency, l.closed, false)
            }
            AssetRef::Portfolio(id) => {
                let p = self.portfolios.live(id)?.values();
                AssetView::account(
                    AssetClass::Portfolio,
                    &p.currency,
                    p.closed,
                    p.category.is_tax_free(),
                )
            }
            AssetRef::Holding {
                portfolio,
                security,
            } => {
                let p = self.portfolios.live(portfolio)?.values();
                let s = self.securities.live(security)?.values();
                let holding = self
                    .holdings
                    .resolve((portfolio, &p.currency), (security, &s.currency))?;
                AssetView {
                    class: AssetClass::SecurityHolding,
                    currency: Some(holding.currency.clone()),
                    closed: p.closed || s.closed,
                    tax_free: p.category.is_tax_free(),
                    payee_type: None,
                    security_type: Some(s.category),
                    holding: Some(holding),
                }
            }
        };
        Ok(view)
    }

    // ========================================================================
    // LINK RESOLUTION
    // ========================================================================

    /// Check that every reference points at a live item, allocating the
    /// holdings that transactions refer to.
    pub fn resolve_links(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let parent_check = |parent: Option<ItemId>, errors: &mut ErrorList| {
            if let Some(parent) = parent {
                if let Err(err) = self.payees.live(parent) {
                    errors.add(FieldId::Parent, err.to_string());
                }
            }
        };

        for item in self.deposits.iter() {
            let mut errors = ErrorList::new();
            parent_check(item.values().parent, &mut errors);
            report.record(Deposit::KIND, item.id(), &item.values().label(), &errors);
        }
        for item in self.loans.iter() {
            let mut errors = ErrorList::new();
            parent_check(item.values().parent, &mut errors);
            report.record(Loan::KIND, item.id(), &item.values().label(), &errors);
        }
        for item in self.portfolios.iter() {
            let mut errors = ErrorList::new();
            parent_check(item.values().parent, &mut errors);
            report.record(Portfolio::KIND, item.id(), &item.values().label(), &errors);
        }
        for item in self.securities.iter() {
            let mut errors = ErrorList::new();
            let security = item.values();
            parent_check(security.parent, &mut errors);
            let underlying = AccountInfoClass::UnderlyingStock;
            if let Some(stock) = security.info.get(underlying).and_then(|v| v.as_link()) {
                if let Err(err) = self.securities.live(stock) {
                    errors.add(underlying.field(), err.to_string());
                }
            }
            report.record(Security::KIND, item.id(), &security.label(), &errors);
        }
        for item in self.cash.iter() {
            let mut errors = ErrorList::new();
            let auto_payee = AccountInfoClass::AutoPayee;
            if let Some(payee) = item.values().info.get(auto_payee).and_then(|v| v.as_link()) {
                if let Err(err) = self.payees.live(payee) {
                    errors.add(auto_payee.field(), err.to_string());
                }
            }
            report.record(Cash::KIND, item.id(), &item.values().label(), &errors);
        }
        for item in self.transactions.iter() {
            let mut errors = ErrorList::new();
            let tx = item.values();
            if let Err(err) = self.asset(tx.account) {
                errors.add(FieldId::Account, err.to_string());
            }
            if let Err(err) = self.asset(tx.partner) {
                errors.add(FieldId::Partner, err.to_string());
            }
            let returned = TransactionInfoClass::ReturnedCashAccount;
            if let Some(deposit) = tx.info.get(returned).and_then(|v| v.as_link()) {
                if let Err(err) = self.deposits.live(deposit) {
                    errors.add(returned.field(), err.to_string());
                }
            }
            report.record(Transaction::KIND, item.id(), &tx.label(), &errors);
        }

        debug!(
            holdings = self.holdings.count(),
            broken = report.errors.len(),
            "links resolved"
        );
        report
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Validate every item, then every list, and report what failed
    pub fn validate(&mut self) -> ValidationReport {
        let payees = check_items(&self.payees, self);
        self.payees.apply_validation(payees);
        let deposits = check_items(&self.deposits, self);
        self.deposits.apply_validation(deposits);
        let cash = check_items(&self.cash, self);
        self.cash.apply_validation(cash);
        let loans = check_items(&self.loans, self);
        self.loans.apply_validation(loans);
        let portfolios = check_items(&self.portfolios, self);
        self.portfolios.apply_validation(portfolios);
        let securities = check_items(&self.securities, self);
        self.securities.apply_validation(securities);
        let transactions = check_items(&self.transactions, self);
        self.transactions.apply_validation(transactions);

        let mut report = ValidationReport::default();
        record_list(&self.payees, &mut report);
        record_list(&self.deposits, &mut report);
        record_list(&self.cash, &mut report);
        record_list(&self.loans, &mut report);
        record_list(&self.portfolios, &mut report);
        record_list(&self.securities, &mut report);
        record_list(&self.transactions, &mut report);

        info!("Validation finished: {}", report.summary());
        report
    }

    // ========================================================================
    // DELETION
    // ========================================================================

    pub fn delete_portfolio(&mut self, id: ItemId) -> Result<bool> {
        let deleted = self.portfolios.delete(id)?;
        if deleted {
            self.holdings.deregister_portfolio(id);
        }
        Ok(deleted)
    }

    pub fn delete_security(&mut self, id: ItemId) -> Result<bool> {
        let deleted = self.securities.delete(id)?;
        if deleted {
            self.holdings.deregister_security(id);
        }
        Ok(deleted)
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Start one edit step across the whole set
    pub fn push_history(&mut self) {
        self.payees.push_history();
        self.deposits.push_history();
        self.cash.push_history();
        self.loans.push_history();
        self.portfolios.push_history();
        self.securities.push_history();
        self.transactions.push_history();
    }

    pub fn pop_history(&mut self) {
        self.payees.pop_history();
        self.deposits.pop_history();
        self.cash.pop_history();
        self.loans.pop_history();
        self.portfolios.pop_history();
        self.securities.pop_history();
        self.transactions.pop_history();
    }

    /// Close the latest step; true if anything changed. A step that
    /// changed nothing is dropped from every list so the lists stay on the
    /// same version.
    pub fn check_for_history(&mut self) -> bool {
        // every list must be settled, so no short-circuit
        let changes = [
            self.payees.settle_step(),
            self.deposits.settle_step(),
            self.cash.settle_step(),
            self.loans.settle_step(),
            self.portfolios.settle_step(),
            self.securities.settle_step(),
            self.transactions.settle_step(),
        ];
        let changed = changes.iter().any(|changed| *changed);
        if !changed {
            self.payees.drop_step();
            self.deposits.drop_step();
            self.cash.drop_step();
            self.loans.drop_step();
            self.portfolios.drop_step();
            self.securities.drop_step();
            self.transactions.drop_step();
        }
        changed
    }

    /// Number of open history steps
    pub fn version(&self) -> usize {
        self.payees.version()
    }

    pub fn commit(&mut self) {
        self.payees.commit();
        self.deposits.commit();
        self.cash.commit();
        self.loans.commit();
        self.portfolios.commit();
        self.securities.commit();
        self.transactions.commit();
        info!("Edit set committed");
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.payees.set_max_history(max_history);
        self.deposits.set_max_history(max_history);
        self.cash.set_max_history(max_history);
        self.loans.set_max_history(max_history);
        self.portfolios.set_max_history(max_history);
        self.securities.set_max_history(max_history);
        self.transactions.set_max_history(max_history);
    }

    // ========================================================================
    // REPORTS
    // ========================================================================

    pub fn tax_summary(&self, config: &Config) -> Vec<TaxYearSummary> {
        tax::summarise(self, config)
    }
}

fn check_items<V: DataItem>(list: &DataList<V>, set: &EditSet) -> HashMap<ItemId, ErrorList> {
    list.iter()
        .map(|item| {
            let mut errors = ErrorList::new();
            item.values().validate(item.id(), set, &mut errors);
            (item.id(), errors)
        })
        .collect()
}

fn record_list<V: DataItem>(list: &DataList<V>, report: &mut ValidationReport) {
    for item in list.iter() {
        report.record(V::KIND, item.id(), &item.values().label(), item.errors());
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        DepositCategory, Direction, PortfolioType, TransactionCategory,
    };
    use crate::infoset::InfoValue;
    use crate::item::{EditState, ItemKind, ItemState};
    use crate::money::{Money, Units};
    use rust_decimal_macros::dec;

    fn payee(set: &mut EditSet, name: &str, kind: PayeeType) -> ItemId {
        set.payees.add(Payee::new(name, kind))
    }

    #[test]
    fn test_open_children_blocks_closing_payee() {
        let mut set = EditSet::new();
        let bank = payee(&mut set, "Bank", PayeeType::Institution);
        set.deposits.add(Deposit::new(
            "Current",
            DepositCategory::Checking,
            bank,
            Currency::gbp(),
        ));
        assert_eq!(set.open_children_of(bank), 1);

        set.payees.update(bank, |p| p.closed = true).unwrap();
        let report = set.validate();
        let errors = report.errors_of_kind(ItemKind::Payee);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Payee still owns 1 open accounts");
        // the open deposit is also flagged for its closed parent
        assert_eq!(report.errors_of_kind(ItemKind::Deposit).len(), 1);
    }

    #[test]
    fn test_validate_singular_and_duplicates() {
        let mut set = EditSet::new();
        payee(&mut set, "HMRC", PayeeType::TaxMan);
        payee(&mut set, "Inland Revenue", PayeeType::TaxMan);
        payee(&mut set, "Tesco", PayeeType::Payee);
        payee(&mut set, "TESCO", PayeeType::Payee);

        let report = set.validate();
        assert_eq!(report.items_checked, 4);
        assert_eq!(report.items_with_errors, 4);
        assert!(report
            .errors
            .iter()
            .any(|e| e.message == "Only one TaxMan Payee is allowed"));
        assert!(report
            .errors
            .iter()
            .any(|e| e.message == "Duplicate name 'TESCO'"));
        assert!(set
            .payees
            .iter()
            .all(|p| p.edit_state() == EditState::Error));
    }

    #[test]
    fn test_validate_clean_book() {
        let mut set = EditSet::new();
        let bank = payee(&mut set, "Bank", PayeeType::Institution);
        set.deposits.add(Deposit::new(
            "Current",
            DepositCategory::Checking,
            bank,
            Currency::gbp(),
        ));

        let report = set.validate();
        assert!(report.is_valid(), "{}", report.summary());
        assert!(set
            .deposits
            .iter()
            .all(|d| d.edit_state() == EditState::Valid));
    }

    fn holding_book() -> (EditSet, ItemId, ItemId, ItemId) {
        let mut set = EditSet::new();
        let broker = payee(&mut set, "Broker", PayeeType::Institution);
        let market = payee(&mut set, "Market", PayeeType::Market);
        let isa = set.portfolios.add(Portfolio::new(
            "ISA",
            PortfolioType::TaxFree,
            broker,
            Currency::gbp(),
        ));
        let fund = set.securities.add(Security::new(
            "Fund",
            SecurityType::Property,
            market,
            Currency::gbp(),
        ));
        let cash = set.deposits.add(Deposit::new(
            "Current",
            DepositCategory::Checking,
            broker,
            Currency::gbp(),
        ));
        (set, isa, fund, cash)
    }

    #[test]
    fn test_holding_views_and_deregistration() {
        let (mut set, isa, fund, cash) = holding_book();
        let holding = AssetRef::Holding {
            portfolio: isa,
            security: fund,
        };

        let mut buy = Transaction::new(
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            holding,
            AssetRef::Deposit(cash),
            TransactionCategory::Transfer,
            Direction::From,
            Some(Money::new(dec!(100), Currency::gbp())),
        );
        buy.info
            .set(
                TransactionInfoClass::AccountDeltaUnits,
                InfoValue::Units(Units(dec!(10))),
            )
            .unwrap();
        set.transactions.add(buy);

        let view = set.asset(holding).unwrap();
        assert!(view.tax_free);
        assert_eq!(view.security_type, Some(SecurityType::Property));
        assert_eq!(set.holdings.count(), 1);

        let report = set.resolve_links();
        assert!(report.is_valid());

        assert!(set.delete_security(fund).unwrap());
        assert_eq!(set.holdings.count(), 0);

        let report = set.resolve_links();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, FieldId::Account);
    }

    #[test]
    fn test_holding_currency_mismatch() {
        let (mut set, isa, fund, _) = holding_book();
        set.securities
            .update(fund, |s| s.currency = Currency::new("USD").unwrap())
            .unwrap();

        let result = set.asset(AssetRef::Holding {
            portfolio: isa,
            security: fund,
        });
        assert!(result.is_err());
        assert_eq!(set.holdings.count(), 0);
    }

    #[test]
    fn test_set_history_round_trip() {
        let mut set = EditSet::new();
        let bank = payee(&mut set, "Bank", PayeeType::Institution);
        set.commit();

        set.push_history();
        assert!(!set.check_for_history());

        assert_eq!(set.version(), 0);

        set.push_history();
        set.payees
            .update(bank, |p| p.desc = Some("High street".to_string()))
            .unwrap();
        assert!(set.check_for_history());
        assert_eq!(set.payees.get(bank).unwrap().state(), ItemState::Changed);

        set.pop_history();
        assert_eq!(set.payees.get(bank).unwrap().state(), ItemState::Clean);
        assert_eq!(set.version(), 0);
    }

    #[test]
    fn test_set_steps_undo_independently() {
        let mut set = EditSet::new();
        let first = payee(&mut set, "First", PayeeType::Payee);
        let second = payee(&mut set, "Second", PayeeType::Payee);
        set.commit();

        set.push_history();
        set.payees
            .update(first, |p| p.desc = Some("one".to_string()))
            .unwrap();
        assert!(set.check_for_history());

        set.push_history();
        set.payees
            .update(second, |p| p.desc = Some("two".to_string()))
            .unwrap();
        assert!(set.check_for_history());
        assert_eq!(set.version(), 2);

        set.pop_history();
        let desc = |set: &EditSet, id| set.payees.get(id).unwrap().values().desc.clone();
        assert_eq!(desc(&set, first), Some("one".to_string()));
        assert_eq!(desc(&set, second), None);

        set.pop_history();
        assert_eq!(desc(&set, first), None);
    }

    #[test]
    fn test_set_step_with_new_item() {
        let mut set = EditSet::new();
        let bank = payee(&mut set, "Bank", PayeeType::Institution);
        set.commit();

        set.push_history();
        let deposit = set.deposits.add(Deposit::new(
            "Current",
            DepositCategory::Checking,
            bank,
            Currency::gbp(),
        ));
        assert!(set.check_for_history());
        assert_eq!(set.deposits.count(), 1);

        set.pop_history();
        assert!(set.deposits.get(deposit).is_none());
        assert_eq!(set.deposits.count(), 0);
        assert_eq!(set.open_children_of(bank), 0);
    }

    #[test]
    fn test_empty_set_step_is_dropped_everywhere() {
        let mut set = EditSet::new();
        let bank = payee(&mut set, "Bank", PayeeType::Institution);
        set.commit();

        set.push_history();
        set.payees.update(bank, |p| p.closed = true).unwrap();
        assert!(set.check_for_history());

        set.push_history();
        assert!(!set.check_for_history());
        assert_eq!(set.version(), 1);
        assert_eq!(set.deposits.version(), 1);

        set.pop_history();
        assert!(!set.payees.get(bank).unwrap().values().closed);
    }

    #[test]
    fn test_delete_portfolio_drops_holdings() {
        let (mut set, isa, fund, _) = holding_book();
        set.asset(AssetRef::Holding {
            portfolio: isa,
            security: fund,
        })
        .unwrap();
        assert_eq!(set.holdings.holdings_for_portfolio(isa).len(), 1);

        assert!(set.delete_portfolio(isa).unwrap());
        assert!(set.holdings.holdings_for_portfolio(isa).is_empty());
        set.commit();
        assert!(set.portfolios.is_empty());
    }
}
