//! Wallet backend seam.
//!
//! The orchestration layer never talks to a chain directly. It drives a
//! [`WalletBackend`] that builds wallets and the [`WalletHandle`]s those
//! builds return. A handle owns whatever the backend keeps per wallet
//! (sync task, connections, key material) until [`WalletHandle::close`].
//!
//! The transfer pipeline is split into the three backend stages the
//! orchestration layer sequences: prepare a recipe, prove it, submit it.
//! The intermediate artifacts are opaque associated types so a backend can
//! carry whatever it needs between stages.
//!
//! [`crate::sim::SimBackend`] is the in-process implementation.

use std::fmt;
use std::future::Future;

use config::Endpoints;
use sdk_core::{NetworkId, Seed, TransferOutput};

use crate::error::BackendError;
use crate::state::StateStream;

/// Identifier the network assigned to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds wallet handles from a seed.
pub trait WalletBackend: Send + Sync + 'static {
    type Handle: WalletHandle;

    /// Constructs a wallet for `seed` on `network`. The wallet is not yet
    /// synchronizing; call [`WalletHandle::start`].
    fn build(
        &self,
        endpoints: &Endpoints,
        seed: &Seed,
        network: NetworkId,
    ) -> impl Future<Output = Result<Self::Handle, BackendError>> + Send;
}

/// A live wallet.
pub trait WalletHandle: Send + Sync + 'static {
    /// Unproven transfer recipe.
    type Recipe: Send;
    /// Proven transaction ready for submission.
    type Proven: Send;

    /// Begins background synchronization. Idempotent.
    fn start(&self);

    /// Subscribes to the wallet's state snapshots.
    fn state(&self) -> StateStream;

    fn transfer_transaction(
        &self,
        outputs: Vec<TransferOutput>,
    ) -> impl Future<Output = Result<Self::Recipe, BackendError>> + Send;

    fn prove_transaction(
        &self,
        recipe: Self::Recipe,
    ) -> impl Future<Output = Result<Self::Proven, BackendError>> + Send;

    fn submit_transaction(
        &self,
        tx: Self::Proven,
    ) -> impl Future<Output = Result<TransactionId, BackendError>> + Send;

    /// Releases the wallet. Consumes the handle so it cannot be used or
    /// closed again.
    fn close(self) -> impl Future<Output = Result<(), BackendError>> + Send;
}
