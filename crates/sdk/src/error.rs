//! SDK error types.
//!
//! [`SdkError`] is the unified error type for all orchestration operations.
//! Backend-reported failures are wrapped in a [`BackendError`] so the stage
//! that failed (build, prepare, prove, submit, close) stays visible in the
//! variant while the backend's own message is preserved.

use std::fmt;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// A failure reported by the wallet backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

// ---------------------------------------------------------------------------
// SdkError
// ---------------------------------------------------------------------------

/// Errors from SDK operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The backend could not construct a wallet (e.g. invalid seed).
    WalletBuild(BackendError),

    /// The wallet did not report `synced` within the configured timeout.
    SyncTimeout,

    /// The wallet did not reach the funds threshold within the timeout.
    FundsTimeout,

    /// The transfer amount is zero.
    InvalidAmount,

    /// The most recent snapshot holds less than the transfer requires.
    InsufficientFunds { observed: u128, required: u128 },

    /// The backend failed to prepare the transfer recipe.
    TransferPrepare(BackendError),

    /// The backend failed to prove the recipe.
    Proving(BackendError),

    /// The backend rejected the proven transaction.
    Submission(BackendError),

    /// Neither a recipient wallet nor a static recipient address is configured.
    NoRecipient,

    /// The state stream ended before the wait resolved.
    StreamClosed,

    /// The operation was cancelled.
    Cancelled,

    /// The backend failed to release a wallet.
    Close(BackendError),

    /// A session operation was called before a seed was set.
    NoActiveWallet,
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WalletBuild(e) => write!(f, "wallet build failed: {e}"),
            Self::SyncTimeout => write!(f, "timed out waiting for wallet sync"),
            Self::FundsTimeout => write!(f, "timed out waiting for funds"),
            Self::InvalidAmount => write!(f, "transfer amount must be positive"),
            Self::InsufficientFunds { observed, required } => write!(
                f,
                "insufficient funds: balance is {observed} but the transfer requires {required}"
            ),
            Self::TransferPrepare(e) => write!(f, "transfer preparation failed: {e}"),
            Self::Proving(e) => write!(f, "proving failed: {e}"),
            Self::Submission(e) => write!(f, "submission failed: {e}"),
            Self::NoRecipient => write!(
                f,
                "no recipient: configure a recipient seed or a recipient address"
            ),
            Self::StreamClosed => write!(f, "wallet state stream closed"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Close(e) => write!(f, "wallet close failed: {e}"),
            Self::NoActiveWallet => write!(f, "seed not set, call set_seed first"),
        }
    }
}

impl std::error::Error for SdkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WalletBuild(e)
            | Self::TransferPrepare(e)
            | Self::Proving(e)
            | Self::Submission(e)
            | Self::Close(e) => Some(e),
            _ => None,
        }
    }
}
