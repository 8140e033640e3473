//! Funds wait: block until a wallet holds at least a threshold balance.
//!
//! # Sampling
//!
//! Snapshots can arrive far faster than is useful to report. The wait
//! evaluates the stream at most once per `sample_interval`, always using
//! the newest snapshot available at evaluation time (latest-value-wins).
//! The first evaluation happens as soon as a snapshot is available, so an
//! already-funded wallet resolves without waiting out an interval.
//!
//! Every evaluation emits a [`FundsProgress`] report. The wait resolves on
//! the first evaluation that meets the threshold, and, unless disabled, also
//! observes `synced == true`.

use std::time::Duration;

use sdk_core::{TokenType, WalletState};
use tokio::time::Instant;
use tracing::{debug, info};

use super::guarded;
use crate::backend::{WalletBackend, WalletHandle};
use crate::report::{FundsProgress, Reporter};
use crate::{Sdk, SdkError};

// ---------------------------------------------------------------------------
// FundsWait
// ---------------------------------------------------------------------------

/// Parameters of a funds wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsWait {
    /// Threshold the balance must reach (inclusive).
    pub min_balance: u128,
    pub token: TokenType,
    /// Whether the satisfying snapshot must also report `synced`.
    pub require_sync: bool,
    /// Minimum spacing between evaluations.
    pub sample_interval: Duration,
    /// Upper bound on the whole wait. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl FundsWait {
    /// Wait for a synced wallet holding at least `min_balance` native units.
    pub fn at_least(min_balance: u128) -> Self {
        Self {
            min_balance,
            token: TokenType::native(),
            require_sync: true,
            sample_interval: config::constants::DEFAULT_FUNDS_SAMPLE_INTERVAL,
            timeout: None,
        }
    }

    /// Wait for `amount` to arrive on top of `baseline`.
    ///
    /// Receipt confirmation: the balance reaching the target is the signal,
    /// so sync is not required.
    pub fn received(baseline: u128, amount: u128) -> Self {
        Self {
            require_sync: false,
            ..Self::at_least(baseline.saturating_add(amount))
        }
    }

    pub fn token(mut self, token: TokenType) -> Self {
        self.token = token;
        self
    }

    pub fn sample_every(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn progress(&self, state: &WalletState) -> FundsProgress {
        FundsProgress {
            synced: state.is_synced(),
            lag: state.lag(),
            balance: state.balance(&self.token),
            target: self.min_balance,
        }
    }

    fn is_satisfied(&self, progress: &FundsProgress) -> bool {
        (progress.synced || !self.require_sync) && progress.balance >= self.min_balance
    }
}

// ---------------------------------------------------------------------------
// Sdk::wait_for_funds
// ---------------------------------------------------------------------------

impl<B: WalletBackend> Sdk<B> {
    /// A [`FundsWait::at_least`] carrying this SDK's sampling and timeout
    /// configuration.
    pub fn funds_wait(&self, min_balance: u128) -> FundsWait {
        FundsWait::at_least(min_balance)
            .sample_every(self.inner.config.funds_sample_interval)
            .timeout(self.inner.config.funds_timeout)
    }

    /// Waits until the wallet's balance of `wait.token` reaches
    /// `wait.min_balance` and returns the observed balance.
    ///
    /// # Errors
    ///
    /// - [`SdkError::FundsTimeout`] if `wait.timeout` elapses
    /// - [`SdkError::StreamClosed`] if the handle stops publishing
    /// - [`SdkError::Cancelled`] if the SDK is shut down
    pub async fn wait_for_funds<H: WalletHandle>(
        &self,
        handle: &H,
        wait: &FundsWait,
    ) -> Result<u128, SdkError> {
        self.check_cancelled()?;
        debug!(
            min_balance = %wait.min_balance,
            require_sync = wait.require_sync,
            "waiting for funds"
        );

        let reporter = self.reporter();
        let balance = guarded(
            &self.inner.cancel,
            wait.timeout,
            SdkError::FundsTimeout,
            sample_until_funded(handle, wait, reporter.as_ref()),
        )
        .await?;

        info!(balance = %balance, target = %wait.min_balance, "funds available");
        Ok(balance)
    }

    /// Returns the current native balance if it already covers
    /// `min_balance`; otherwise waits for it with [`Sdk::funds_wait`].
    ///
    /// The immediate check reads the latest snapshot whether or not it is
    /// synced. Only the fallback wait requires sync.
    pub async fn ensure_funds<H: WalletHandle>(
        &self,
        handle: &H,
        min_balance: u128,
    ) -> Result<u128, SdkError> {
        let balance = self.balance(handle).await?;
        if balance >= min_balance {
            debug!(balance = %balance, min_balance = %min_balance, "already funded");
            return Ok(balance);
        }
        self.reporter()
            .notice(&format!("balance {balance} is below {min_balance}, waiting for funds"));
        self.wait_for_funds(handle, &self.funds_wait(min_balance)).await
    }
}

/// The throttled evaluation loop.
async fn sample_until_funded<H: WalletHandle>(
    handle: &H,
    wait: &FundsWait,
    reporter: &dyn Reporter,
) -> Result<u128, SdkError> {
    let mut stream = handle.state();
    stream.mark_changed();
    let mut next_sample = Instant::now();

    loop {
        stream.changed().await?;
        tokio::time::sleep_until(next_sample).await;

        // Whatever arrived during the sleep collapses into this one read.
        let Some(state) = stream.latest() else {
            continue;
        };
        next_sample = Instant::now() + wait.sample_interval;

        let progress = wait.progress(&state);
        reporter.funds_progress(&progress);
        if wait.is_satisfied(&progress) {
            return Ok(progress.balance);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
