// 🧩 Security Holdings - (Portfolio × Security) composite identities
//
// A holding is never stored. It comes into existence the first time a
// transaction refers to a security inside a portfolio, and it goes away when
// either side is deleted. The map is interior-locked so lookups can allocate
// while the rest of the edit set is only borrowed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{MoneyWiseError, Result};
use crate::item::ItemId;
use crate::money::Currency;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHolding {
    pub portfolio: ItemId,
    pub security: ItemId,
    pub currency: Currency,
}

impl SecurityHolding {
    /// Composite id "<portfolio>:<security>"
    pub fn id(&self) -> String {
        format!("{}:{}", self.portfolio, self.security)
    }
}

impl fmt::Display for SecurityHolding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

type SecurityMap = HashMap<ItemId, Arc<SecurityHolding>>;

/// Thread-safe two-level map Portfolio → Security → Holding
#[derive(Debug, Default)]
pub struct SecurityHoldingMap {
    inner: RwLock<HashMap<ItemId, SecurityMap>>,
}

impl SecurityHoldingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup without allocation
    pub fn get(&self, portfolio: ItemId, security: ItemId) -> Option<Arc<SecurityHolding>> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&portfolio)
            .and_then(|securities| securities.get(&security))
            .cloned()
    }

    /// Fetch the holding, allocating it on first use.
    ///
    /// The caller supplies the current currency of each side. A cached
    /// holding whose currency no longer matches is replaced.
    pub fn resolve(
        &self,
        portfolio: (ItemId, &Currency),
        security: (ItemId, &Currency),
    ) -> Result<Arc<SecurityHolding>> {
        let (portfolio, portfolio_currency) = portfolio;
        let (security, security_currency) = security;

        if portfolio_currency != security_currency {
            return Err(MoneyWiseError::InvalidHolding {
                portfolio,
                security,
                reason: format!(
                    "portfolio currency {} differs from security currency {}",
                    portfolio_currency, security_currency
                ),
            });
        }

        if let Some(holding) = self.get(portfolio, security) {
            if &holding.currency == security_currency {
                return Ok(holding);
            }
        }

        // another caller may have allocated between the read and the write
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let slot = map.entry(portfolio).or_default().entry(security);
        let holding = match slot {
            Entry::Occupied(mut cached) => {
                if &cached.get().currency != security_currency {
                    cached.insert(Self::allocate(portfolio, security, security_currency));
                }
                Arc::clone(cached.get())
            }
            Entry::Vacant(vacant) => Arc::clone(vacant.insert(Self::allocate(
                portfolio,
                security,
                security_currency,
            ))),
        };
        Ok(holding)
    }

    fn allocate(portfolio: ItemId, security: ItemId, currency: &Currency) -> Arc<SecurityHolding> {
        let holding = Arc::new(SecurityHolding {
            portfolio,
            security,
            currency: currency.clone(),
        });
        debug!("Allocated holding {}", holding);
        holding
    }

    /// Remove every holding in the portfolio; returns how many went
    pub fn deregister_portfolio(&self, portfolio: ItemId) -> usize {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = map.remove(&portfolio).map_or(0, |securities| securities.len());
        if removed > 0 {
            debug!("Deregistered {} holdings of portfolio {}", removed, portfolio);
        }
        removed
    }

    /// Remove every holding of the security across all portfolios
    pub fn deregister_security(&self, security: ItemId) -> usize {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for securities in map.values_mut() {
            if securities.remove(&security).is_some() {
                removed += 1;
            }
        }
        map.retain(|_, securities| !securities.is_empty());
        if removed > 0 {
            debug!("Deregistered {} holdings of security {}", removed, security);
        }
        removed
    }

    pub fn holdings_for_portfolio(&self, portfolio: ItemId) -> Vec<Arc<SecurityHolding>> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&portfolio)
            .map(|securities| securities.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.values().map(|securities| securities.len()).sum()
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================
