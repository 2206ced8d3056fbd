// ⚙️ Configuration - reporting currency, tax year and history depth
//
// Loaded from a JSON file (every field optional) and then overridden from
// the environment:
//   MONEYWISE_CURRENCY     reporting currency code
//   MONEYWISE_MAX_HISTORY  history depth per item (0 = unbounded)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{MoneyWiseError, Result};
use crate::item::versioned::DEFAULT_MAX_HISTORY;
use crate::money::Currency;
use crate::tax::TaxYearStart;

pub const ENV_CURRENCY: &str = "MONEYWISE_CURRENCY";
pub const ENV_MAX_HISTORY: &str = "MONEYWISE_MAX_HISTORY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reporting_currency: Currency,
    pub tax_year_start: TaxYearStart,
    pub max_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reporting_currency: Currency::gbp(),
            tax_year_start: TaxYearStart::default(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            MoneyWiseError::InvalidConfig(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| MoneyWiseError::InvalidConfig(e.to_string()))?;
        config.tax_year_start.check()?;

        debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Config::default().apply_env()
    }

    /// Apply environment overrides on top of this config
    pub fn apply_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the process environment in
    /// production, a map in tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(code) = lookup(ENV_CURRENCY) {
            self.reporting_currency = Currency::new(&code)?;
        }
        if let Some(depth) = lookup(ENV_MAX_HISTORY) {
            self.max_history = depth.trim().parse().map_err(|_| {
                MoneyWiseError::InvalidConfig(format!("{}={}", ENV_MAX_HISTORY, depth))
            })?;
        }
        Ok(self)
    }
}
