//! Wallet SDK: readiness waits, transfers, and run orchestration.
//!
//! The SDK drives a [`WalletBackend`] through the steps of a one-shot
//! transfer run:
//! - **Lifecycle** (`build_wallet`, `reopen_wallet`, `close_wallet`)
//! - **Readiness** (`wait_for_sync`, `wait_for_funds`)
//! - **Transfer** (`execute_transfer`: pre-check, prepare, prove, submit)
//! - **Orchestration** ([`orchestrator::RunOrchestrator`]) sequencing the above
//!
//! # Architecture
//!
//! Wallet state arrives as a stream of snapshots published by the backend.
//! Every wait is a subscription to that stream ([`state::StateStream`]) and
//! resolves exactly once. Reporting goes through a pluggable
//! [`report::Reporter`]; multi-step operations are recorded through a
//! pluggable [`tracking::OperationStore`].
//!
//! # Usage
//!
//! ```no_run
//! use sdk::{Sdk, SdkConfig};
//! use sdk::sim::{SimBackend, SimLedger};
//! use sdk_core::Seed;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), sdk::SdkError> {
//! let cancel = CancellationToken::new();
//! let sdk = Sdk::new(SdkConfig::default(), SimBackend::new(SimLedger::new()), cancel.clone());
//!
//! let wallet = sdk.build_wallet(&Seed::generate()).await?;
//! sdk.wait_for_sync(&wallet).await?;
//! let balance = sdk.balance(&wallet).await?;
//! sdk.close_wallet(wallet).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod operations;
pub mod orchestrator;
pub mod report;
pub mod session;
pub mod sim;
pub mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use backend::{TransactionId, WalletBackend, WalletHandle};
pub use error::{BackendError, SdkError};
pub use operations::funds::FundsWait;
pub use operations::tracking;
pub use operations::transfer::{TransferReceipt, TransferRequest};

use std::sync::{Arc, RwLock};
use std::time::Duration;

use config::{Endpoints, RunConfig};
use sdk_core::NetworkId;
use tokio_util::sync::CancellationToken;

use crate::operations::tracking::{NoopOperationStore, OperationStore, OperationTracker};
use crate::report::{Reporter, TracingReporter};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// SDK configuration.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    pub network: NetworkId,
    pub endpoints: Endpoints,
    /// Upper bound on `wait_for_sync`. `None` waits indefinitely.
    pub sync_timeout: Option<Duration>,
    /// Minimum spacing between funds-wait evaluations.
    pub funds_sample_interval: Duration,
    /// Upper bound on `wait_for_funds`. `None` waits indefinitely.
    pub funds_timeout: Option<Duration>,
}

impl SdkConfig {
    pub fn from_run_config(run: &RunConfig) -> Self {
        Self {
            network: run.network,
            endpoints: run.endpoints.clone(),
            sync_timeout: run.sync_timeout,
            funds_sample_interval: run.funds_sample_interval,
            funds_timeout: run.funds_timeout,
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::default(),
            endpoints: Endpoints::default(),
            sync_timeout: None,
            funds_sample_interval: config::constants::DEFAULT_FUNDS_SAMPLE_INTERVAL,
            funds_timeout: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sdk
// ---------------------------------------------------------------------------

/// Shared state across all SDK operations.
pub(crate) struct SdkInner<B> {
    pub config: SdkConfig,
    pub backend: B,
    pub reporter: RwLock<Arc<dyn Reporter>>,
    pub operation_store: RwLock<Arc<dyn OperationStore>>,
    pub cancel: CancellationToken,
}

/// The SDK entry point.
///
/// `Clone`-able (wraps an `Arc<SdkInner>`).
///
/// # Type Parameters
///
/// - `B`: Wallet backend that builds [`WalletHandle`]s
pub struct Sdk<B> {
    pub(crate) inner: Arc<SdkInner<B>>,
}

impl<B> Clone for Sdk<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> std::fmt::Debug for Sdk<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("network", &self.inner.config.network)
            .finish()
    }
}

impl<B: WalletBackend> Sdk<B> {
    /// Creates a new SDK instance. No backend I/O happens here.
    pub fn new(config: SdkConfig, backend: B, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(SdkInner {
                config,
                backend,
                reporter: RwLock::new(Arc::new(TracingReporter)),
                operation_store: RwLock::new(Arc::new(NoopOperationStore)),
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Signals cancellation to every in-flight wait.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Returns [`SdkError::Cancelled`] if the cancellation token has fired.
    pub(crate) fn check_cancelled(&self) -> Result<(), SdkError> {
        if self.inner.cancel.is_cancelled() {
            Err(SdkError::Cancelled)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    /// Replace the reporter at runtime.
    pub fn set_reporter(&self, reporter: Arc<dyn Reporter>) {
        *self.inner.reporter.write().unwrap() = reporter;
    }

    /// Get the current reporter (cheap `Arc` clone).
    pub fn reporter(&self) -> Arc<dyn Reporter> {
        self.inner.reporter.read().unwrap().clone()
    }

    // -----------------------------------------------------------------------
    // Operation tracking
    // -----------------------------------------------------------------------

    /// Replace the operation store at runtime.
    pub fn set_operation_store(&self, store: Arc<dyn OperationStore>) {
        *self.inner.operation_store.write().unwrap() = store;
    }

    pub fn operation_store(&self) -> Arc<dyn OperationStore> {
        self.inner.operation_store.read().unwrap().clone()
    }

    pub(crate) fn tracker(&self, kind: tracking::OperationKind) -> OperationTracker {
        OperationTracker::start(self.operation_store(), kind)
    }

    /// Query a tracked operation by ID.
    pub fn query_operation(&self, id: tracking::OperationId) -> Option<tracking::Operation> {
        self.operation_store().get(id)
    }
}
