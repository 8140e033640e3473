//! One-shot transfer run.
//!
//! # Run Flow
//!
//! 1. **Primary ready**: build and sync the primary wallet. If its synced
//!    balance is exactly zero, wait for funds (`>= 1`, synced). Any non-zero
//!    balance proceeds without waiting, even one below the transfer amount;
//!    the transfer pre-check reports that case.
//! 2. **Secondary ready**: with a secondary seed, build and sync the
//!    recipient wallet and record its pre-transfer balance.
//! 3. **Report** `BEFORE` balances.
//! 4. **Resolve recipient**: the secondary's address, else the configured
//!    static address, else [`SdkError::NoRecipient`].
//! 5. **Transfer** the configured amount.
//! 6. **Confirm**: reopen the secondary and wait until its balance reaches
//!    pre-transfer balance + amount; without a secondary, sleep the settle
//!    grace period.
//! 7. **Report** `AFTER` balances.
//! 8. **Close** every handle that is still open, on every exit path.
//!
//! Any error aborts the run. There is no retry; cleanup is the only
//! recovery.

use std::time::{Duration, Instant};

use config::RunConfig;
use sdk_core::{Seed, WalletState};
use tracing::{error, info, warn};

use crate::backend::{WalletBackend, WalletHandle};
use crate::operations::funds::FundsWait;
use crate::operations::guarded;
use crate::operations::tracking::{OperationId, OperationKind, OperationStep, OperationTracker};
use crate::operations::transfer::{TransferReceipt, TransferRequest};
use crate::report::{BalanceLine, ReportStage};
use crate::{Sdk, SdkError};

pub const PRIMARY_LABEL: &str = "primary";
pub const SECONDARY_LABEL: &str = "secondary";

// ---------------------------------------------------------------------------
// Plan / summary
// ---------------------------------------------------------------------------

/// What a run does.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub primary_seed: Seed,
    /// Recipient wallet to build, watch, and confirm receipt on.
    pub secondary_seed: Option<Seed>,
    /// Fallback recipient when there is no secondary wallet.
    pub recipient_address: Option<String>,
    pub transfer_amount: u128,
    /// Sleep after submitting when there is no secondary to watch.
    pub settle_grace: Duration,
}

impl RunPlan {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            primary_seed: config.primary_seed.clone(),
            secondary_seed: config.secondary_seed.clone(),
            recipient_address: config.recipient_address.clone(),
            transfer_amount: config.transfer_amount,
            settle_grace: config.settle_grace,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub operation_id: OperationId,
    pub primary_address: String,
    pub secondary_address: Option<String>,
    pub recipient: String,
    pub receipt: TransferReceipt,
    pub before: Vec<BalanceLine>,
    pub after: Vec<BalanceLine>,
    /// `true` when receipt was observed on the secondary wallet, `false`
    /// when the run only waited out the settle grace period.
    pub confirmed: bool,
}

// ---------------------------------------------------------------------------
// RunOrchestrator
// ---------------------------------------------------------------------------

/// Handles the run currently owns. Whatever is here at the end gets closed.
struct OpenWallets<H> {
    primary: Option<H>,
    secondary: Option<H>,
}

/// Sequences a single run over an [`Sdk`].
pub struct RunOrchestrator<B> {
    sdk: Sdk<B>,
    plan: RunPlan,
}

impl<B: WalletBackend> RunOrchestrator<B> {
    pub fn new(sdk: Sdk<B>, plan: RunPlan) -> Self {
        Self { sdk, plan }
    }

    pub fn sdk(&self) -> &Sdk<B> {
        &self.sdk
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Executes the run. Every handle built along the way is closed before
    /// this returns, whatever the outcome.
    pub async fn run(&self) -> Result<RunSummary, SdkError> {
        let mut tracker = self.sdk.tracker(OperationKind::Run);
        let operation_id = tracker.id();
        info!(
            %operation_id,
            amount = %self.plan.transfer_amount,
            with_secondary = self.plan.secondary_seed.is_some(),
            "run started"
        );

        let mut wallets = OpenWallets {
            primary: None,
            secondary: None,
        };
        let result = self.drive(&mut wallets, &mut tracker).await;
        self.release(wallets).await;

        match &result {
            Ok(summary) => info!(
                %operation_id,
                tx_id = %summary.receipt.tx_id,
                confirmed = summary.confirmed,
                "run complete"
            ),
            Err(e) => error!(%operation_id, error = %e, "run failed"),
        }
        tracker.finish(result)
    }

    async fn drive(
        &self,
        wallets: &mut OpenWallets<B::Handle>,
        tracker: &mut OperationTracker,
    ) -> Result<RunSummary, SdkError> {
        let sdk = &self.sdk;
        let plan = &self.plan;

        // 1. Primary ready.
        let started = Instant::now();
        let ready = self.build_synced(&plan.primary_seed, &mut wallets.primary).await;
        let (primary, primary_state) =
            tracker.step(OperationStep::PrimaryReady, started, ready)?;
        let primary_address = primary_state.address.clone();

        let mut primary_balance = primary_state.native_balance();
        if primary_balance == 0 {
            sdk.reporter()
                .notice(&format!("waiting for funds at {primary_address}"));
            let started = Instant::now();
            let funded = sdk.wait_for_funds(primary, &sdk.funds_wait(1)).await;
            primary_balance =
                tracker.step(OperationStep::PrimaryFunds, started, funded)?;
        } else {
            tracker.step_skipped(OperationStep::PrimaryFunds);
        }

        // 2. Secondary ready.
        let mut secondary_before = None;
        if let Some(seed) = &plan.secondary_seed {
            let started = Instant::now();
            let ready = self.build_synced(seed, &mut wallets.secondary).await;
            let (_, state) =
                tracker.step(OperationStep::SecondaryReady, started, ready)?;
            secondary_before = Some((state.address.clone(), state.native_balance()));
        } else {
            tracker.step_skipped(OperationStep::SecondaryReady);
        }

        let secondary_address = secondary_before
            .as_ref()
            .map(|(address, _)| address.clone());

        // 3. Report BEFORE.
        let before = balance_lines(
            primary_balance,
            secondary_before.as_ref().map(|(_, balance)| *balance),
        );
        sdk.reporter().balances(ReportStage::Before, &before);

        // 4. Resolve recipient.
        let started = Instant::now();
        let recipient = secondary_address
            .clone()
            .or_else(|| plan.recipient_address.clone())
            .ok_or(SdkError::NoRecipient);
        let recipient =
            tracker.step(OperationStep::ResolveRecipient, started, recipient)?;

        // 5. Transfer.
        let started = Instant::now();
        let request = TransferRequest::native(recipient.clone(), plan.transfer_amount);
        let receipt = sdk.execute_transfer(primary, &request).await;
        let receipt = tracker.step(OperationStep::Transfer, started, receipt)?;

        // 6. Confirm.
        let started = Instant::now();
        let confirmed = match (&plan.secondary_seed, secondary_before) {
            (Some(seed), Some((_, baseline))) => {
                self.confirm_receipt(seed, baseline, &mut wallets.secondary)
                    .await
            }
            _ => self.settle().await,
        };
        let secondary_after =
            tracker.step(OperationStep::Confirm, started, confirmed)?;

        // 7. Report AFTER.
        let started = Instant::now();
        let after = sdk
            .balance(primary)
            .await
            .map(|balance| balance_lines(balance, secondary_after));
        let after = tracker.step(OperationStep::Report, started, after)?;
        sdk.reporter().balances(ReportStage::After, &after);

        Ok(RunSummary {
            operation_id: tracker.id(),
            primary_address,
            secondary_address,
            recipient,
            receipt,
            before,
            after,
            confirmed: secondary_after.is_some(),
        })
    }

    /// Builds a wallet into `slot` and waits for it to sync. The handle is
    /// placed in `slot` before the wait so cleanup sees it if sync fails.
    async fn build_synced<'a>(
        &self,
        seed: &Seed,
        slot: &'a mut Option<B::Handle>,
    ) -> Result<(&'a B::Handle, WalletState), SdkError> {
        let handle = self.sdk.build_wallet(seed).await?;
        let handle = &*slot.insert(handle);
        let state = self.sdk.wait_for_sync(handle).await?;
        Ok((handle, state))
    }

    /// Reopens the secondary and waits for `baseline + amount`. Returns the
    /// confirmed balance.
    async fn confirm_receipt(
        &self,
        seed: &Seed,
        baseline: u128,
        slot: &mut Option<B::Handle>,
    ) -> Result<Option<u128>, SdkError> {
        let sdk = &self.sdk;
        sdk.reporter().notice("reopening recipient wallet to confirm receipt");

        // The old handle moves into reopen, which closes it. On failure
        // the slot stays empty: reopen has already closed anything it built.
        let fresh = sdk.reopen_wallet(seed, slot.take()).await?;
        let fresh = &*slot.insert(fresh);

        let wait = FundsWait::received(baseline, self.plan.transfer_amount)
            .sample_every(sdk.config().funds_sample_interval)
            .timeout(sdk.config().funds_timeout);
        let balance = sdk.wait_for_funds(fresh, &wait).await?;
        Ok(Some(balance))
    }

    /// Sleeps the settle grace period. No secondary balance to report.
    async fn settle(&self) -> Result<Option<u128>, SdkError> {
        let grace = self.plan.settle_grace;
        self.sdk.reporter().notice(&format!(
            "no recipient wallet to watch, waiting {}s for the network to settle",
            grace.as_secs_f64()
        ));
        guarded(self.sdk.cancel(), None, SdkError::Cancelled, async {
            tokio::time::sleep(grace).await;
            Ok(None)
        })
        .await
    }

    /// Closes every handle the run still owns. Close failures are logged;
    /// they never replace the run's own outcome.
    async fn release(&self, wallets: OpenWallets<B::Handle>) {
        for (label, handle) in [
            (PRIMARY_LABEL, wallets.primary),
            (SECONDARY_LABEL, wallets.secondary),
        ] {
            if let Some(handle) = handle {
                if let Err(e) = self.sdk.close_wallet(handle).await {
                    warn!(wallet = label, error = %e, "failed to close wallet");
                }
            }
        }
    }
}

fn balance_lines(primary: u128, secondary: Option<u128>) -> Vec<BalanceLine> {
    let mut lines = vec![BalanceLine::new(PRIMARY_LABEL, primary)];
    if let Some(balance) = secondary {
        lines.push(BalanceLine::new(SECONDARY_LABEL, balance));
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
