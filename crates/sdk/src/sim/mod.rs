//! In-process simulated backend.
//!
//! [`SimBackend`] implements [`WalletBackend`] against a shared
//! [`SimLedger`], so the whole orchestration (sync, funding, transfer,
//! receipt) can run without a network:
//!
//! - Addresses are the Bech32m encoding of `sha256(seed)` for the network.
//! - On start, a wallet publishes `sync_steps` lagging snapshots spaced by
//!   `step_delay`, with a zero balance, then a synced snapshot with its ledger
//!   balance, then a fresh synced snapshot on every ledger change.
//! - Submitting applies the transfer to the ledger, which the recipient's
//!   wallet observes through the same change feed.
//! - One-shot faults can be injected at any backend stage.

mod ledger;

pub use ledger::SimLedger;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use config::Endpoints;
use sdk_core::{
    NetworkId, Seed, SyncLag, SyncProgress, TokenType, TransferOutput, WalletAddress, WalletState,
};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{TransactionId, WalletBackend, WalletHandle};
use crate::error::BackendError;
use crate::state::{StatePublisher, StateStream};

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// A backend stage that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    Build,
    Prepare,
    Prove,
    Submit,
    Close,
}

#[derive(Default)]
struct SimShared {
    faults: Mutex<Vec<SimFault>>,
    open: AtomicUsize,
}

impl SimShared {
    fn trip(&self, fault: SimFault) -> Result<(), BackendError> {
        let mut faults = self.faults.lock().unwrap();
        match faults.iter().position(|f| *f == fault) {
            Some(i) => {
                faults.remove(i);
                Err(BackendError::new(format!("injected {fault:?} failure")))
            }
            None => Ok(()),
        }
    }
}

/// Derives the address a seed owns on `network`.
pub fn derive_address(seed: &Seed, network: NetworkId) -> Result<String, BackendError> {
    let bytes = seed
        .to_bytes()
        .map_err(|e| BackendError::new(format!("seed is not valid hex: {e}")))?;
    if bytes.is_empty() {
        return Err(BackendError::new("seed is empty"));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&Sha256::digest(&bytes));
    Ok(WalletAddress::from_key(network, key).encode())
}

// ---------------------------------------------------------------------------
// SimBackend
// ---------------------------------------------------------------------------

/// Builds [`SimWallet`]s over a shared ledger.
pub struct SimBackend {
    ledger: SimLedger,
    sync_steps: u64,
    step_delay: Duration,
    prove_delay: Duration,
    shared: Arc<SimShared>,
}

impl SimBackend {
    pub fn new(ledger: SimLedger) -> Self {
        Self {
            ledger,
            sync_steps: 3,
            step_delay: Duration::from_millis(200),
            prove_delay: Duration::from_millis(500),
            shared: Arc::default(),
        }
    }

    /// Number of lagging snapshots published before a wallet reports synced.
    pub fn with_sync_steps(mut self, steps: u64) -> Self {
        self.sync_steps = steps;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_prove_delay(mut self, delay: Duration) -> Self {
        self.prove_delay = delay;
        self
    }

    pub fn ledger(&self) -> &SimLedger {
        &self.ledger
    }

    /// Makes the next call at `fault`'s stage fail.
    pub fn inject(&self, fault: SimFault) {
        self.shared.faults.lock().unwrap().push(fault);
    }

    /// Wallets built and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }
}

impl WalletBackend for SimBackend {
    type Handle = SimWallet;

    async fn build(
        &self,
        _endpoints: &Endpoints,
        seed: &Seed,
        network: NetworkId,
    ) -> Result<SimWallet, BackendError> {
        self.shared.trip(SimFault::Build)?;
        let address = derive_address(seed, network)?;

        self.shared.open.fetch_add(1, Ordering::SeqCst);
        debug!(%address, "sim wallet built");
        Ok(SimWallet {
            address,
            network,
            ledger: self.ledger.clone(),
            publisher: Arc::new(StatePublisher::new()),
            sync_steps: self.sync_steps,
            step_delay: self.step_delay,
            prove_delay: self.prove_delay,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            shared: self.shared.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// SimWallet
// ---------------------------------------------------------------------------

/// A wallet backed by [`SimLedger`].
pub struct SimWallet {
    address: String,
    network: NetworkId,
    ledger: SimLedger,
    publisher: Arc<StatePublisher>,
    sync_steps: u64,
    step_delay: Duration,
    prove_delay: Duration,
    started: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<SimShared>,
}

/// Unproven recipe: the validated outputs.
pub struct SimRecipe {
    outputs: Vec<TransferOutput>,
}

/// Proven transaction: the outputs plus a proof digest.
pub struct SimProvenTx {
    outputs: Vec<TransferOutput>,
    proof: [u8; 32],
}

impl SimWallet {
    pub fn address(&self) -> &str {
        &self.address
    }

    fn check_output(&self, output: &TransferOutput) -> Result<(), BackendError> {
        if output.amount == 0 {
            return Err(BackendError::new("output amount must be positive"));
        }
        if !output.token.is_native() {
            return Err(BackendError::new(format!(
                "unsupported token {}",
                output.token
            )));
        }
        let receiver = WalletAddress::parse(&output.receiver_address)
            .map_err(|e| BackendError::new(format!("invalid receiver address: {e}")))?;
        if receiver.network() != self.network {
            return Err(BackendError::new(format!(
                "receiver is on {}, wallet is on {}",
                receiver.network(),
                self.network
            )));
        }
        Ok(())
    }
}

impl WalletHandle for SimWallet {
    type Recipe = SimRecipe;
    type Proven = SimProvenTx;

    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let task = tokio::spawn(follow_ledger(
            self.publisher.clone(),
            self.ledger.clone(),
            self.address.clone(),
            self.sync_steps,
            self.step_delay,
            self.cancel.clone(),
        ));
        *self.task.lock().unwrap() = Some(task);
    }

    fn state(&self) -> StateStream {
        self.publisher.subscribe()
    }

    async fn transfer_transaction(
        &self,
        outputs: Vec<TransferOutput>,
    ) -> Result<SimRecipe, BackendError> {
        self.shared.trip(SimFault::Prepare)?;
        if outputs.is_empty() {
            return Err(BackendError::new("transfer has no outputs"));
        }
        for output in &outputs {
            self.check_output(output)?;
        }

        let total = outputs
            .iter()
            .try_fold(0u128, |acc, o| acc.checked_add(o.amount))
            .ok_or_else(|| BackendError::new("transfer total overflows"))?;
        let available = self.ledger.balance_of(&self.address);
        if available < total {
            return Err(BackendError::new(format!(
                "not enough coins: {available} available, {total} needed"
            )));
        }
        Ok(SimRecipe { outputs })
    }

    async fn prove_transaction(&self, recipe: SimRecipe) -> Result<SimProvenTx, BackendError> {
        self.shared.trip(SimFault::Prove)?;
        tokio::time::sleep(self.prove_delay).await;

        let mut hasher = Sha256::new();
        hasher.update(self.address.as_bytes());
        for output in &recipe.outputs {
            hasher.update(output.receiver_address.as_bytes());
            hasher.update(output.amount.to_be_bytes());
        }
        let mut proof = [0u8; 32];
        proof.copy_from_slice(&hasher.finalize());
        Ok(SimProvenTx {
            outputs: recipe.outputs,
            proof,
        })
    }

    async fn submit_transaction(&self, tx: SimProvenTx) -> Result<TransactionId, BackendError> {
        self.shared.trip(SimFault::Submit)?;

        let mut height = 0;
        for output in &tx.outputs {
            height = self
                .ledger
                .apply_transfer(&self.address, &output.receiver_address, output.amount)?;
        }

        let mut hasher = Sha256::new();
        hasher.update(tx.proof);
        hasher.update(height.to_be_bytes());
        let id = hex::encode(hasher.finalize());
        info!(tx_id = %id, height, "sim transaction applied");
        Ok(TransactionId::new(id))
    }

    async fn close(self) -> Result<(), BackendError> {
        self.cancel.cancel();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
        debug!(address = %self.address, "sim wallet closed");
        self.shared.trip(SimFault::Close)
    }
}

// A handle dropped without `close` still stops its sync task.
impl Drop for SimWallet {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Publishes the catch-up sequence, then a synced snapshot per ledger change.
async fn follow_ledger(
    publisher: Arc<StatePublisher>,
    ledger: SimLedger,
    address: String,
    sync_steps: u64,
    step_delay: Duration,
    cancel: CancellationToken,
) {
    let mut changes = ledger.subscribe();

    for remaining in (1..=sync_steps).rev() {
        publisher.publish(WalletState {
            balances: [(TokenType::native(), 0)].into(),
            sync_progress: Some(SyncProgress {
                synced: false,
                lag: Some(SyncLag {
                    source_gap: remaining,
                    apply_gap: 0,
                }),
            }),
            address: address.clone(),
        });
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(step_delay) => {}
        }
    }

    loop {
        changes.borrow_and_update();
        publisher.publish(WalletState {
            balances: [(TokenType::native(), ledger.balance_of(&address))].into(),
            sync_progress: Some(SyncProgress {
                synced: true,
                lag: Some(SyncLag::default()),
            }),
            address: address.clone(),
        });
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = changes.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
