//! Long-lived wallet session behind the tool server.
//!
//! A session holds at most one active wallet. `set_seed` swaps it out; every
//! other operation runs against whatever is active and fails with
//! [`SdkError::NoActiveWallet`] until a seed has been set.

use sdk_core::Seed;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::{WalletBackend, WalletHandle};
use crate::operations::transfer::{TransferReceipt, TransferRequest};
use crate::{Sdk, SdkError};

/// One active wallet plus the seed it was built from.
struct ActiveWallet<H> {
    seed: Seed,
    handle: H,
}

pub struct WalletSession<B: WalletBackend> {
    sdk: Sdk<B>,
    active: Mutex<Option<ActiveWallet<B::Handle>>>,
}

impl<B: WalletBackend> WalletSession<B> {
    pub fn new(sdk: Sdk<B>) -> Self {
        Self {
            sdk,
            active: Mutex::new(None),
        }
    }

    pub fn sdk(&self) -> &Sdk<B> {
        &self.sdk
    }

    pub async fn has_wallet(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// The seed of the active wallet, if any.
    pub async fn seed(&self) -> Option<Seed> {
        self.active.lock().await.as_ref().map(|a| a.seed.clone())
    }

    /// Makes `seed` the active wallet.
    ///
    /// The previous wallet is closed first; a failure to close it is logged
    /// and otherwise ignored. The new wallet starts syncing in the background
    /// and is not waited on.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::WalletBuild`] if the backend rejects the seed. The
    /// session is left without an active wallet in that case.
    pub async fn set_seed(&self, seed: Seed) -> Result<(), SdkError> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            if let Err(e) = previous.handle.close().await {
                warn!(error = %e, "ignoring close failure of previous wallet");
            }
        }

        let handle = self.sdk.build_wallet(&seed).await?;
        *active = Some(ActiveWallet { seed, handle });
        info!("session wallet initialized");
        Ok(())
    }

    /// Native-token balance of the active wallet.
    pub async fn balance(&self) -> Result<u128, SdkError> {
        let active = self.active.lock().await;
        let wallet = active.as_ref().ok_or(SdkError::NoActiveWallet)?;
        self.sdk.balance(&wallet.handle).await
    }

    pub async fn address(&self) -> Result<String, SdkError> {
        let active = self.active.lock().await;
        let wallet = active.as_ref().ok_or(SdkError::NoActiveWallet)?;
        self.sdk.address(&wallet.handle).await
    }

    /// Sends `amount` native units from the active wallet to `recipient`.
    ///
    /// `amount` must be a non-empty string of decimal digits.
    ///
    /// # Errors
    ///
    /// - [`SdkError::NoActiveWallet`] before `set_seed`
    /// - [`SdkError::InvalidAmount`] for a malformed or zero amount
    /// - any error from [`Sdk::execute_transfer`]
    pub async fn transfer(&self, recipient: &str, amount: &str) -> Result<TransferReceipt, SdkError> {
        let active = self.active.lock().await;
        let wallet = active.as_ref().ok_or(SdkError::NoActiveWallet)?;
        let amount = parse_amount(amount)?;
        self.sdk
            .execute_transfer(&wallet.handle, &TransferRequest::native(recipient, amount))
            .await
    }

    /// Closes the active wallet, if any.
    pub async fn shutdown(&self) -> Result<(), SdkError> {
        match self.active.lock().await.take() {
            Some(wallet) => self.sdk.close_wallet(wallet.handle).await,
            None => Ok(()),
        }
    }
}

/// Parses a decimal amount. Signs, whitespace and separators are rejected.
pub fn parse_amount(raw: &str) -> Result<u128, SdkError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SdkError::InvalidAmount);
    }
    raw.parse().map_err(|_| SdkError::InvalidAmount)
}
