//! Sync wait: block until a wallet reports it has caught up.

use sdk_core::WalletState;
use tracing::{debug, info};

use super::guarded;
use crate::backend::{WalletBackend, WalletHandle};
use crate::{Sdk, SdkError};

impl<B: WalletBackend> Sdk<B> {
    /// Waits for the first snapshot whose sync progress reports `synced`
    /// and returns it.
    ///
    /// Snapshots without sync progress count as not synced. Resolves
    /// immediately if the current snapshot is already synced. The
    /// subscription is released on every exit path.
    ///
    /// # Errors
    ///
    /// - [`SdkError::SyncTimeout`] if `sync_timeout` is configured and elapses
    /// - [`SdkError::StreamClosed`] if the handle stops publishing
    /// - [`SdkError::Cancelled`] if the SDK is shut down
    pub async fn wait_for_sync<H: WalletHandle>(
        &self,
        handle: &H,
    ) -> Result<WalletState, SdkError> {
        self.check_cancelled()?;
        debug!("waiting for wallet sync");

        let state = guarded(
            &self.inner.cancel,
            self.inner.config.sync_timeout,
            SdkError::SyncTimeout,
            handle.state().first_matching(WalletState::is_synced),
        )
        .await?;

        info!(address = %state.address, "wallet synced");
        Ok(state)
    }
}
