//! Shared in-process ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::error::BackendError;

/// Balances keyed by address, plus a height counter that moves on every
/// change. Clones share the same ledger.
#[derive(Clone)]
pub struct SimLedger {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    balances: Mutex<HashMap<String, u128>>,
    height: watch::Sender<u64>,
}

impl SimLedger {
    pub fn new() -> Self {
        let (height, _) = watch::channel(0);
        Self {
            inner: Arc::new(LedgerInner {
                balances: Mutex::new(HashMap::new()),
                height,
            }),
        }
    }

    /// A ledger with `balances` already credited.
    pub fn with_genesis<I, A>(balances: I) -> Self
    where
        I: IntoIterator<Item = (A, u128)>,
        A: Into<String>,
    {
        let ledger = Self::new();
        {
            let mut map = ledger.inner.balances.lock().unwrap();
            for (address, amount) in balances {
                *map.entry(address.into()).or_default() += amount;
            }
        }
        ledger
    }

    /// Credits `amount` to `address` out of thin air.
    pub fn fund(&self, address: &str, amount: u128) {
        {
            let mut map = self.inner.balances.lock().unwrap();
            let entry = map.entry(address.to_owned()).or_default();
            *entry = entry.saturating_add(amount);
        }
        debug!(address, amount = %amount, "ledger funded");
        self.advance();
    }

    pub fn balance_of(&self, address: &str) -> u128 {
        self.inner
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Moves `amount` from `from` to `to` and returns the new height.
    pub fn apply_transfer(&self, from: &str, to: &str, amount: u128) -> Result<u64, BackendError> {
        {
            let mut map = self.inner.balances.lock().unwrap();
            let available = map.get(from).copied().unwrap_or(0);
            if available < amount {
                return Err(BackendError::new(format!(
                    "ledger rejected transfer: {from} holds {available}, needs {amount}"
                )));
            }
            map.insert(from.to_owned(), available - amount);
            let credit = map.entry(to.to_owned()).or_default();
            *credit = credit.saturating_add(amount);
        }
        Ok(self.advance())
    }

    pub fn height(&self) -> u64 {
        *self.inner.height.borrow()
    }

    /// Receiver that changes whenever the ledger does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.height.subscribe()
    }

    fn advance(&self) -> u64 {
        let mut height = 0;
        self.inner.height.send_modify(|h| {
            *h += 1;
            height = *h;
        });
        height
    }
}

impl Default for SimLedger {
    fn default() -> Self {
        Self::new()
    }
}
