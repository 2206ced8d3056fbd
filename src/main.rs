// MoneyWise CLI - validate books, import registers, summarise tax years

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moneywise::{
    import_register_file, BookDocument, Config, DocumentIssue, LoadedBook, TaxBucket,
    ValidationReport,
};

/// 💷 MoneyWise - personal-finance book checker
#[derive(Debug, Parser)]
#[command(name = "moneywise", version, about)]
struct Cli {
    /// JSON config file (reporting currency, tax year start, history depth)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a book and report every validation error
    Validate { book: PathBuf },
    /// Summarise income and tax paid per tax year
    Tax { book: PathBuf },
    /// Import a CSV register into a book, then validate the result
    Import { book: PathBuf, register: PathBuf },
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Log filter from MONEYWISE_LOG (default "info"), format from
/// MONEYWISE_LOG_FORMAT ("text" or "json")
fn init_tracing() {
    let log_format = std::env::var("MONEYWISE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_env("MONEYWISE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Returns whether the book came out clean
fn run(cli: Cli) -> Result<bool> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Validate { book } => {
            let mut loaded = load_book(book, &config)?;
            let links = loaded.set.resolve_links();
            let report = loaded.set.validate();
            print_issues(&loaded.issues);
            print_report(&links, &report, cli.json)?;
            Ok(loaded.issues.is_empty() && links.is_valid() && report.is_valid())
        }
        Command::Tax { book } => {
            let loaded = load_book(book, &config)?;
            let years = loaded.set.tax_summary(&config);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&years)?);
                return Ok(true);
            }

            println!("🧮 Tax summary ({})", config.reporting_currency);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for year in &years {
                println!("\n📅 {} ({} transactions)", year.year, year.transactions);
                for (bucket, amount) in &year.buckets {
                    println!("  {:<20} {:>12}", bucket.as_str(), amount.round_dp(2));
                }
                println!(
                    "  {:<20} {:>12}",
                    "Taxable income",
                    year.taxable_income()?.round_dp(2)
                );
                if year.skipped > 0 {
                    println!(
                        "  ⚠️  {} transactions skipped (other currencies or amounts out of range)",
                        year.skipped
                    );
                }
            }
            let paid = years
                .iter()
                .try_fold(Decimal::ZERO, |total, y| {
                    total.checked_add(y.get(TaxBucket::TaxPaid))
                })
                .context("Total tax paid is out of range")?;
            println!("\n✓ {} tax years, {} tax paid in total", years.len(), paid.round_dp(2));
            Ok(true)
        }
        Command::Import { book, register } => {
            let mut loaded = load_book(book, &config)?;
            let summary = import_register_file(&mut loaded.set, &config, register)
                .with_context(|| format!("Failed to import register {}", register.display()))?;
            println!(
                "📥 Imported {} transactions from {}",
                summary.imported,
                register.display()
            );
            print_issues(&loaded.issues);
            print_issues(&summary.issues);

            let links = loaded.set.resolve_links();
            let report = loaded.set.validate();
            print_report(&links, &report, cli.json)?;
            Ok(summary.issues.is_empty() && links.is_valid() && report.is_valid())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .apply_env(),
        None => Config::from_env(),
    };
    config.context("Invalid environment override")
}

fn load_book(path: &Path, config: &Config) -> Result<LoadedBook> {
    let doc = BookDocument::from_file(path)
        .with_context(|| format!("Failed to read book {}", path.display()))?;
    Ok(doc.load(config))
}

fn print_issues(issues: &[DocumentIssue]) {
    for issue in issues {
        println!("⚠️  {}", issue);
    }
}

/// Both halves of a check, as printed by --json
#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    links: &'a ValidationReport,
    validation: &'a ValidationReport,
}

fn print_report(links: &ValidationReport, report: &ValidationReport, json: bool) -> Result<()> {
    if json {
        let output = CheckOutput {
            links,
            validation: report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for error in links.errors.iter().chain(&report.errors) {
        println!("❌ {}", error);
    }
    if report.is_valid() && links.is_valid() {
        println!("✅ {}", report.summary());
    } else {
        println!("📋 {}", report.summary());
    }
    Ok(())
}
