//! Transfers: pre-check, prepare, prove, submit.
//!
//! # Transfer Flow
//!
//! 1. **Amount check**: zero amounts are rejected before the backend is
//!    touched.
//! 2. **Balance check**: the latest snapshot must hold at least the amount
//!    in the requested token.
//! 3. **Prepare**: the backend builds an unproven recipe with one output.
//! 4. **Prove**: the backend generates the zero-knowledge proof. This is
//!    the slow step.
//! 5. **Submit**: the proven transaction goes to the network; the returned
//!    identifier is the receipt.
//!
//! Each stage runs only after the previous one succeeded. A failure maps to
//! the stage's own error variant and nothing after it runs.

use std::time::Instant;

use sdk_core::{TokenType, TransferOutput};
use tracing::{info, warn};

use super::guarded;
use super::tracking::{OperationId, OperationKind, OperationStep, OperationTracker};
use crate::backend::{TransactionId, WalletBackend, WalletHandle};
use crate::{Sdk, SdkError};

// ---------------------------------------------------------------------------
// Request / receipt
// ---------------------------------------------------------------------------

/// A single-output transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub amount: u128,
    pub recipient: String,
    pub token: TokenType,
}

impl TransferRequest {
    /// A transfer of `amount` native units to `recipient`.
    pub fn native(recipient: impl Into<String>, amount: u128) -> Self {
        Self {
            amount,
            recipient: recipient.into(),
            token: TokenType::native(),
        }
    }

    fn output(&self) -> TransferOutput {
        TransferOutput {
            amount: self.amount,
            receiver_address: self.recipient.clone(),
            token: self.token.clone(),
        }
    }
}

/// Result of a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub operation_id: OperationId,
    pub tx_id: TransactionId,
    pub amount: u128,
    pub recipient: String,
    /// Sender balance observed by the pre-check.
    pub balance_before: u128,
}

// ---------------------------------------------------------------------------
// Sdk::execute_transfer
// ---------------------------------------------------------------------------

impl<B: WalletBackend> Sdk<B> {
    /// Sends `request.amount` of `request.token` from `handle` to
    /// `request.recipient`.
    ///
    /// # Errors
    ///
    /// - [`SdkError::InvalidAmount`] for a zero amount
    /// - [`SdkError::InsufficientFunds`] if the latest snapshot holds less
    ///   than the amount
    /// - [`SdkError::TransferPrepare`], [`SdkError::Proving`],
    ///   [`SdkError::Submission`] for backend failures at each stage
    pub async fn execute_transfer<H: WalletHandle>(
        &self,
        handle: &H,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, SdkError> {
        self.check_cancelled()?;

        let mut tracker = self.tracker(OperationKind::Transfer);
        let operation_id = tracker.id();
        let result = self.run_transfer(handle, request, &mut tracker).await;

        if let Err(e) = &result {
            warn!(%operation_id, error = %e, "transfer failed");
        }
        tracker
            .finish(result)
            .map(|(tx_id, balance_before)| TransferReceipt {
                operation_id,
                tx_id,
                amount: request.amount,
                recipient: request.recipient.clone(),
                balance_before,
            })
    }

    async fn run_transfer<H: WalletHandle>(
        &self,
        handle: &H,
        request: &TransferRequest,
        tracker: &mut OperationTracker,
    ) -> Result<(TransactionId, u128), SdkError> {
        let reporter = self.reporter();
        let cancel = &self.inner.cancel;

        // 1-2. Pre-checks.
        let started = Instant::now();
        let observed = if request.amount == 0 {
            Err(SdkError::InvalidAmount)
        } else {
            guarded(cancel, None, SdkError::Cancelled, handle.state().current())
                .await
                .and_then(|state| {
                    let observed = state.balance(&request.token);
                    if observed < request.amount {
                        Err(SdkError::InsufficientFunds {
                            observed,
                            required: request.amount,
                        })
                    } else {
                        Ok(observed)
                    }
                })
        };
        let observed = tracker.step(OperationStep::BalanceCheck, started, observed)?;

        reporter.notice(&format!("target address: {}", request.recipient));
        reporter.notice(&format!(
            "sending {} ({}) from balance {observed}",
            request.amount, request.token
        ));

        // 3. Prepare.
        let started = Instant::now();
        let recipe = guarded(cancel, None, SdkError::Cancelled, async {
            handle
                .transfer_transaction(vec![request.output()])
                .await
                .map_err(SdkError::TransferPrepare)
        })
        .await;
        let recipe = tracker.step(OperationStep::Prepare, started, recipe)?;
        reporter.notice("transfer recipe prepared");

        // 4. Prove.
        reporter.notice("proving transaction, this may take a while");
        let started = Instant::now();
        let proven = guarded(cancel, None, SdkError::Cancelled, async {
            handle
                .prove_transaction(recipe)
                .await
                .map_err(SdkError::Proving)
        })
        .await;
        let proven = tracker.step(OperationStep::Prove, started, proven)?;
        reporter.notice("transaction proven");

        // 5. Submit. Never raced against cancellation.
        let started = Instant::now();
        let submitted = handle
            .submit_transaction(proven)
            .await
            .map_err(SdkError::Submission);
        let tx_id = tracker.step(OperationStep::Submit, started, submitted)?;

        reporter.notice(&format!("transaction submitted: {tx_id}"));
        info!(
            operation_id = %tracker.id(),
            %tx_id,
            amount = %request.amount,
            recipient = %request.recipient,
            "transfer submitted"
        );
        Ok((tx_id, observed))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
