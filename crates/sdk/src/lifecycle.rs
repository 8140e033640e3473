//! Wallet lifecycle: build, reopen, close.
//!
//! - `build_wallet` constructs a wallet through the backend and starts its
//!   background sync. It does not wait for sync.
//! - `reopen_wallet` replaces an existing handle with a fresh one for the
//!   same seed. The old handle is closed first and its close errors are
//!   logged, never propagated. The fresh handle is returned only once synced;
//!   if sync fails it is closed before the error is returned, so the caller
//!   never ends up owning a half-open wallet.
//! - `close_wallet` consumes the handle; a closed handle cannot be reused.

use sdk_core::Seed;
use tracing::{debug, info, warn};

use crate::backend::{WalletBackend, WalletHandle};
use crate::operations::guarded;
use crate::{Sdk, SdkError};

impl<B: WalletBackend> Sdk<B> {
    /// Builds a wallet for `seed` and starts synchronizing it.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::WalletBuild`] if the backend rejects the seed or
    /// cannot reach its endpoints.
    pub async fn build_wallet(&self, seed: &Seed) -> Result<B::Handle, SdkError> {
        self.check_cancelled()?;

        let config = &self.inner.config;
        let build = async {
            self.inner
                .backend
                .build(&config.endpoints, seed, config.network)
                .await
                .map_err(SdkError::WalletBuild)
        };
        let handle = guarded(&self.inner.cancel, None, SdkError::Cancelled, build).await?;

        handle.start();
        info!(network = %config.network, "wallet built, sync started");
        Ok(handle)
    }

    /// Closes `existing` (if any), builds a fresh wallet for `seed`, and
    /// waits for it to sync.
    pub async fn reopen_wallet(
        &self,
        seed: &Seed,
        existing: Option<B::Handle>,
    ) -> Result<B::Handle, SdkError> {
        if let Some(old) = existing {
            debug!("closing wallet before reopen");
            if let Err(e) = old.close().await {
                warn!(error = %e, "ignoring close failure during reopen");
            }
        }

        let fresh = self.build_wallet(seed).await?;
        match self.wait_for_sync(&fresh).await {
            Ok(_) => {
                info!("wallet reopened and synced");
                Ok(fresh)
            }
            Err(e) => {
                if let Err(close_err) = fresh.close().await {
                    warn!(error = %close_err, "close after failed reopen sync also failed");
                }
                Err(e)
            }
        }
    }

    /// Releases `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Close`] if the backend reports a failure. The
    /// handle is consumed either way.
    pub async fn close_wallet(&self, handle: B::Handle) -> Result<(), SdkError> {
        handle.close().await.map_err(SdkError::Close)?;
        debug!("wallet closed");
        Ok(())
    }
}
