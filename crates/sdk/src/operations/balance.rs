//! Point-in-time queries against a wallet's latest snapshot.

use sdk_core::{TokenType, WalletState};

use super::guarded;
use crate::backend::{WalletBackend, WalletHandle};
use crate::{Sdk, SdkError};

impl<B: WalletBackend> Sdk<B> {
    /// The latest snapshot, or the first one to be published if the handle
    /// has not published yet. Does not wait for sync.
    pub async fn current_state<H: WalletHandle>(&self, handle: &H) -> Result<WalletState, SdkError> {
        self.check_cancelled()?;
        guarded(
            &self.inner.cancel,
            None,
            SdkError::Cancelled,
            handle.state().current(),
        )
        .await
    }

    /// Native-token balance from the latest snapshot.
    pub async fn balance<H: WalletHandle>(&self, handle: &H) -> Result<u128, SdkError> {
        self.token_balance(handle, &TokenType::native()).await
    }

    pub async fn token_balance<H: WalletHandle>(
        &self,
        handle: &H,
        token: &TokenType,
    ) -> Result<u128, SdkError> {
        Ok(self.current_state(handle).await?.balance(token))
    }

    /// The wallet's receiving address.
    pub async fn address<H: WalletHandle>(&self, handle: &H) -> Result<String, SdkError> {
        Ok(self.current_state(handle).await?.address)
    }
}
