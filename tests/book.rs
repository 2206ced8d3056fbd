// Full-book checks: load from disk, edit, validate, undo, commit, tax

use std::io::Write;

use moneywise::{
    import_register_file, AssetRef, BookDocument, Config, Direction, EditSet, FieldId, ItemKind,
    ItemState, Money, TaxBucket, Transaction, TransactionCategory, TransactionInfoClass,
};
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

const BOOK: &str = r#"{
    "payees": [
        {"name": "Barclays", "category": "Institution"},
        {"name": "Acme Ltd", "category": "Employer"},
        {"name": "HMRC", "category": "TaxMan"},
        {"name": "LSE", "category": "Market"},
        {"name": "Tesco", "category": "Payee"}
    ],
    "deposits": [
        {"name": "Current", "category": "Checking", "parent": "Barclays"},
        {"name": "Cash ISA", "category": "TaxFreeSavings", "parent": "Barclays"}
    ],
    "cash": [
        {"name": "Petrol", "category": "AutoExpense",
         "info": {"AutoExpense": "Expense", "AutoPayee": "Tesco"}}
    ],
    "portfolios": [
        {"name": "Dealing", "category": "Standard", "parent": "Barclays"}
    ],
    "securities": [
        {"name": "Alpha", "category": "Shares", "parent": "LSE",
         "info": {"Symbol": "ALP", "Region": "UK"}},
        {"name": "Beta", "category": "Shares", "parent": "LSE",
         "info": {"Symbol": "BET", "Region": "UK"}}
    ],
    "transactions": [
        {"date": "2024-03-25", "account": "Current", "partner": "Acme Ltd",
         "category": "TaxedIncome", "direction": "From", "amount": "3000.00",
         "info": {"TaxCredit": "600.00", "EmployeeNatIns": "200.00"}},
        {"date": "2024-05-01", "account": "Cash ISA", "partner": "Barclays",
         "category": "Interest", "direction": "From", "amount": "12.34"},
        {"date": "2024-05-02", "account": "Dealing:Alpha", "partner": "Current",
         "category": "Transfer", "direction": "From", "amount": 1000,
         "info": {"AccountDeltaUnits": 200, "Price": "5.00"}},
        {"date": "2024-08-01", "account": "Dealing:Alpha", "partner": "Dealing:Beta",
         "category": "StockDeMerger", "direction": "To",
         "info": {"Dilution": "0.75", "PartnerDeltaUnits": 50}},
        {"date": "2025-01-31", "account": "Current", "partner": "HMRC",
         "category": "IncomeTax", "direction": "To", "amount": "150.00",
         "reconciled": true}
    ]
}"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn load(config: &Config) -> EditSet {
    let file = write_temp(BOOK);
    let loaded = BookDocument::from_file(file.path()).unwrap().load(config);
    assert!(loaded.issues.is_empty(), "{:?}", loaded.issues);
    loaded.set
}

#[test]
fn test_book_from_disk_is_valid() {
    let mut set = load(&Config::default());

    assert!(set.resolve_links().is_valid());
    let report = set.validate();
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.items_checked, 5 + 2 + 1 + 1 + 2 + 5);
    assert_eq!(set.holdings.count(), 2);
}

#[test]
fn test_edit_validate_undo_commit() {
    let mut set = load(&Config::default());
    let current = set.deposits.find_by_name("Current").unwrap().id();
    let acme = set.payees.find_by_name("Acme Ltd").unwrap().id();

    // a salary without its tax credit is rejected
    set.push_history();
    let salary = set.transactions.add(Transaction::new(
        chrono::NaiveDate::from_ymd_opt(2024, 5, 25).unwrap(),
        AssetRef::Deposit(current),
        AssetRef::Payee(acme),
        TransactionCategory::TaxedIncome,
        Direction::From,
        Some(Money::new(dec!(3000), moneywise::Currency::gbp())),
    ));
    let report = set.validate();
    let errors = report.errors_for(salary);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, FieldId::Info("TaxCredit"));

    // closing the bank fails while it owns open accounts
    set.push_history();
    let barclays = set.payees.find_by_name("Barclays").unwrap().id();
    set.payees.update(barclays, |p| p.closed = true).unwrap();
    assert!(set.check_for_history());
    let report = set.validate();
    assert!(!report.errors_of_kind(ItemKind::Payee).is_empty());
    assert!(!report.errors_of_kind(ItemKind::Deposit).is_empty());

    // one undo reverts the closure and keeps the salary step
    set.pop_history();
    assert_eq!(
        set.payees.get(barclays).unwrap().state(),
        ItemState::Clean
    );
    assert_eq!(set.version(), 1);
    assert_eq!(set.transactions.get(salary).unwrap().state(), ItemState::New);

    set.transactions.delete(salary).unwrap();
    assert_eq!(
        set.transactions.get(salary).unwrap().state(),
        ItemState::DelNew
    );

    let report = set.validate();
    assert!(report.is_valid(), "{:?}", report.errors);

    set.commit();
    assert!(set.transactions.get(salary).is_none());
    assert_eq!(set.transactions.count(), 5);
}

#[test]
fn test_undo_register_import_step() {
    let config = Config::default();
    let mut set = load(&config);
    let register = write_temp(
        "date,account,partner,category,direction,amount,reference\n\
         2024-09-01,Current,Tesco,Expense,To,45.10,\n",
    );

    set.push_history();
    let summary = import_register_file(&mut set, &config, register.path()).unwrap();
    assert_eq!(summary.imported, 1);
    assert!(set.check_for_history());
    assert_eq!(set.transactions.count(), 6);

    set.pop_history();
    assert_eq!(set.transactions.count(), 5);
    assert_eq!(set.version(), 0);
}

#[test]
fn test_deleting_security_breaks_its_transactions() {
    let mut set = load(&Config::default());
    let beta = set.securities.find_by_name("Beta").unwrap().id();

    assert!(set.delete_security(beta).unwrap());
    assert_eq!(set.holdings.count(), 1);

    let links = set.resolve_links();
    assert_eq!(links.errors.len(), 1);
    assert_eq!(links.errors[0].kind, ItemKind::Transaction);
    assert_eq!(links.errors[0].field, FieldId::Partner);
}

#[test]
fn test_tax_summary_for_book() {
    let config = Config::default();
    let set = load(&config);
    let years = set.tax_summary(&config);

    assert_eq!(years.len(), 2);
    let (ending_2024, ending_2025) = (&years[0], &years[1]);

    assert_eq!(ending_2024.year.ending_year(), 2024);
    assert_eq!(ending_2024.get(TaxBucket::Salary), dec!(3800));
    assert_eq!(ending_2024.get(TaxBucket::TaxPaid), dec!(600));
    assert_eq!(ending_2024.get(TaxBucket::NationalInsurance), dec!(200));

    assert_eq!(ending_2025.year.ending_year(), 2025);
    assert_eq!(ending_2025.get(TaxBucket::TaxFreeInterest), dec!(12.34));
    assert_eq!(ending_2025.get(TaxBucket::TaxPaid), dec!(150));
    assert_eq!(ending_2025.get(TaxBucket::Interest), dec!(0));
}

#[test]
fn test_import_register_from_disk() {
    let config = Config::default();
    let mut set = load(&config);
    let register = write_temp(
        "date,account,partner,category,direction,amount,reference\n\
         2024-09-01,Current,Tesco,Expense,To,45.10,\n\
         2024-09-02,Petrol,Tesco,Expense,To,30.00,FUEL\n\
         2024-09-03,Nowhere,Tesco,Expense,To,1.00,\n",
    );

    let summary = import_register_file(&mut set, &config, register.path()).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.issues.len(), 1);

    let report = set.validate();
    assert!(report.is_valid(), "{:?}", report.errors);

    let fuel = set
        .transactions
        .iter()
        .find(|t| {
            t.values()
                .info
                .get(TransactionInfoClass::Reference)
                .and_then(|v| v.as_text())
                == Some("FUEL")
        })
        .unwrap();
    assert_eq!(fuel.state(), ItemState::New);
}

#[test]
fn test_config_history_depth() {
    let config = Config {
        max_history: 2,
        ..Config::default()
    };
    let mut set = load(&config);
    let tesco = set.payees.find_by_name("Tesco").unwrap().id();

    for desc in ["one", "two", "three"] {
        set.push_history();
        set.payees
            .update(tesco, |p| p.desc = Some(desc.to_string()))
            .unwrap();
        assert!(set.check_for_history());
    }
    assert_eq!(set.payees.get(tesco).unwrap().version(), 2);

    // the oldest step was condensed away on the item
    set.pop_history();
    set.pop_history();
    set.pop_history();
    assert_eq!(
        set.payees.get(tesco).unwrap().values().desc.as_deref(),
        Some("one")
    );
}
