//! Scripted backend for unit tests.
//!
//! [`ScriptedWallet`] publishes exactly the snapshots a test hands it and
//! records every backend call, so tests can assert on ordering and on what
//! never ran. Clones share state: a test keeps one clone to publish from
//! while the code under test owns another.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use config::Endpoints;
use sdk_core::{NetworkId, Seed, SyncLag, SyncProgress, TokenType, TransferOutput, WalletState};
use tokio_util::sync::CancellationToken;

use crate::backend::{TransactionId, WalletBackend, WalletHandle};
use crate::error::BackendError;
use crate::state::{StatePublisher, StateStream};
use crate::{Sdk, SdkConfig};

// ---------------------------------------------------------------------------
// Snapshot helpers
// ---------------------------------------------------------------------------

/// A native-token snapshot. The address is filled in by the publishing
/// wallet.
pub fn snapshot(synced: bool, balance: u128) -> WalletState {
    WalletState {
        balances: [(TokenType::native(), balance)].into(),
        sync_progress: Some(SyncProgress { synced, lag: None }),
        address: String::new(),
    }
}

/// An unsynced snapshot carrying lag metrics.
pub fn lagging(balance: u128, source_gap: u64, apply_gap: u64) -> WalletState {
    WalletState {
        sync_progress: Some(SyncProgress {
            synced: false,
            lag: Some(SyncLag {
                source_gap,
                apply_gap,
            }),
        }),
        ..snapshot(false, balance)
    }
}

/// A snapshot without any sync progress.
pub fn no_progress(balance: u128) -> WalletState {
    WalletState {
        sync_progress: None,
        ..snapshot(false, balance)
    }
}

pub fn scripted_sdk(config: SdkConfig) -> Sdk<ScriptedBackend> {
    scripted_sdk_with(config, ScriptedBackend::new())
}

pub fn scripted_sdk_with(config: SdkConfig, backend: ScriptedBackend) -> Sdk<ScriptedBackend> {
    Sdk::new(config, backend, CancellationToken::new())
}

// ---------------------------------------------------------------------------
// Call records
// ---------------------------------------------------------------------------

/// A transfer-stage call on a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Prepare, with the summed output amount.
    Prepare(u128),
    Prove,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Prepare,
    Prove,
    Submit,
}

/// A call on the backend itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// Build, with the seed's hex.
    Build(String),
    /// Close, with the wallet's id (ids start at 1).
    Close(u64),
}

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BackendShared {
    calls: Mutex<Vec<BackendCall>>,
    open: AtomicUsize,
    next_id: AtomicU64,
    build_failure: Mutex<Option<String>>,
    default_script: Mutex<Vec<WalletState>>,
    scripts: Mutex<HashMap<String, Vec<WalletState>>>,
    wallet_failures: Mutex<Vec<(Stage, String)>>,
    wallets: Mutex<Vec<ScriptedWallet>>,
}

#[derive(Clone, Default)]
pub struct ScriptedBackend {
    shared: Arc<BackendShared>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots every built wallet publishes on start, in order.
    pub fn script_states(&self, states: Vec<WalletState>) {
        *self.shared.default_script.lock().unwrap() = states;
    }

    /// Snapshots published on start by wallets built from `seed`.
    pub fn script_seed(&self, seed: &Seed, states: Vec<WalletState>) {
        self.shared
            .scripts
            .lock()
            .unwrap()
            .insert(seed.expose().to_owned(), states);
    }

    pub fn fail_builds(&self, message: &str) {
        *self.shared.build_failure.lock().unwrap() = Some(message.to_owned());
    }

    /// Makes every wallet built from now on fail at `stage`.
    pub fn fail_wallets_at(&self, stage: Stage, message: &str) {
        self.shared
            .wallet_failures
            .lock()
            .unwrap()
            .push((stage, message.to_owned()));
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// Wallets built and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Every wallet built so far, in build order.
    pub fn wallets(&self) -> Vec<ScriptedWallet> {
        self.shared.wallets.lock().unwrap().clone()
    }
}

impl WalletBackend for ScriptedBackend {
    type Handle = ScriptedWallet;

    async fn build(
        &self,
        _endpoints: &Endpoints,
        seed: &Seed,
        _network: NetworkId,
    ) -> Result<ScriptedWallet, BackendError> {
        let shared = &self.shared;
        shared
            .calls
            .lock()
            .unwrap()
            .push(BackendCall::Build(seed.expose().to_owned()));
        if let Some(message) = shared.build_failure.lock().unwrap().clone() {
            return Err(BackendError::new(message));
        }

        let id = shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let script = shared
            .scripts
            .lock()
            .unwrap()
            .get(seed.expose())
            .cloned()
            .unwrap_or_else(|| shared.default_script.lock().unwrap().clone());

        let wallet = ScriptedWallet::with_shared(id, &format!("w{id}"), script, shared.clone());
        for (stage, message) in shared.wallet_failures.lock().unwrap().iter() {
            wallet.fail_at(*stage, message);
        }
        shared.open.fetch_add(1, Ordering::SeqCst);
        shared.wallets.lock().unwrap().push(wallet.clone());
        Ok(wallet)
    }
}

// ---------------------------------------------------------------------------
// ScriptedWallet
// ---------------------------------------------------------------------------

struct WalletInner {
    id: u64,
    address: String,
    publisher: Mutex<Option<StatePublisher>>,
    on_start: Vec<WalletState>,
    started: AtomicBool,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<Stage>>,
    failure_message: Mutex<String>,
    close_failure: Mutex<Option<String>>,
    submits: AtomicU64,
    shared: Arc<BackendShared>,
}

#[derive(Clone)]
pub struct ScriptedWallet {
    inner: Arc<WalletInner>,
}

impl std::fmt::Debug for ScriptedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedWallet")
            .field("id", &self.inner.id)
            .field("address", &self.inner.address)
            .finish_non_exhaustive()
    }
}

impl ScriptedWallet {
    /// A standalone wallet, not tracked by any backend.
    pub fn new(label: &str) -> Self {
        Self::with_shared(0, label, Vec::new(), Arc::default())
    }

    fn with_shared(
        id: u64,
        label: &str,
        on_start: Vec<WalletState>,
        shared: Arc<BackendShared>,
    ) -> Self {
        Self {
            inner: Arc::new(WalletInner {
                id,
                address: format!("addr_test1{label}"),
                publisher: Mutex::new(Some(StatePublisher::new())),
                on_start,
                started: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
                failures: Mutex::new(HashSet::new()),
                failure_message: Mutex::new(String::new()),
                close_failure: Mutex::new(None),
                submits: AtomicU64::new(0),
                shared,
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Publishes `state`, stamping this wallet's address if it has none.
    pub fn publish(&self, mut state: WalletState) {
        if state.address.is_empty() {
            state.address = self.inner.address.clone();
        }
        if let Some(publisher) = self.inner.publisher.lock().unwrap().as_ref() {
            publisher.publish(state);
        }
    }

    /// Drops the publisher so every subscription sees the stream close.
    pub fn end_stream(&self) {
        self.inner.publisher.lock().unwrap().take();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .publisher
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, StatePublisher::subscriber_count)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn fail_at(&self, stage: Stage, message: &str) {
        self.inner.failures.lock().unwrap().insert(stage);
        *self.inner.failure_message.lock().unwrap() = message.to_owned();
    }

    pub fn fail_close(&self, message: &str) {
        *self.inner.close_failure.lock().unwrap() = Some(message.to_owned());
    }

    fn enter(&self, call: Call, stage: Stage) -> Result<(), BackendError> {
        self.inner.calls.lock().unwrap().push(call);
        if self.inner.failures.lock().unwrap().contains(&stage) {
            return Err(BackendError::new(
                self.inner.failure_message.lock().unwrap().clone(),
            ));
        }
        Ok(())
    }
}

impl WalletHandle for ScriptedWallet {
    type Recipe = Vec<TransferOutput>;
    type Proven = Vec<TransferOutput>;

    fn start(&self) {
        if !self.inner.started.swap(true, Ordering::SeqCst) {
            for state in &self.inner.on_start {
                self.publish(state.clone());
            }
        }
    }

    fn state(&self) -> StateStream {
        match self.inner.publisher.lock().unwrap().as_ref() {
            Some(publisher) => publisher.subscribe(),
            // A publisher dropped on the spot yields an already-closed stream.
            None => StatePublisher::new().subscribe(),
        }
    }

    async fn transfer_transaction(
        &self,
        outputs: Vec<TransferOutput>,
    ) -> Result<Vec<TransferOutput>, BackendError> {
        let total = outputs.iter().map(|o| o.amount).sum();
        self.enter(Call::Prepare(total), Stage::Prepare)?;
        Ok(outputs)
    }

    async fn prove_transaction(
        &self,
        recipe: Vec<TransferOutput>,
    ) -> Result<Vec<TransferOutput>, BackendError> {
        self.enter(Call::Prove, Stage::Prove)?;
        Ok(recipe)
    }

    async fn submit_transaction(
        &self,
        _tx: Vec<TransferOutput>,
    ) -> Result<TransactionId, BackendError> {
        self.enter(Call::Submit, Stage::Submit)?;
        let n = self.inner.submits.fetch_add(1, Ordering::SeqCst) + 1;
        let label = self.inner.address.trim_start_matches("addr_test1");
        Ok(TransactionId::new(format!("tx-{label}-{n}")))
    }

    async fn close(self) -> Result<(), BackendError> {
        let shared = &self.inner.shared;
        shared
            .calls
            .lock()
            .unwrap()
            .push(BackendCall::Close(self.inner.id));
        if self.inner.id != 0 {
            shared.open.fetch_sub(1, Ordering::SeqCst);
        }
        self.end_stream();

        match self.inner.close_failure.lock().unwrap().clone() {
            Some(message) => Err(BackendError::new(message)),
            None => Ok(()),
        }
    }
}
