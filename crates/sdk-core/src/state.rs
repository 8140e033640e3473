//! Wallet state snapshots and transfer outputs.
//!
//! A backend publishes a stream of [`WalletState`] values. Each snapshot is
//! immutable; a later snapshot from the same stream supersedes it.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// TokenType
// ---------------------------------------------------------------------------

/// Identifier of the ledger's native token.
const NATIVE_TOKEN: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Token identifier used as the key of [`WalletState::balances`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenType(String);

impl TokenType {
    /// The ledger's native token.
    pub fn native() -> Self {
        Self(NATIVE_TOKEN.to_owned())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_TOKEN
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Sync progress
// ---------------------------------------------------------------------------

/// Block-count gaps between the local view and the remote tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncLag {
    /// Blocks not yet fetched from the source.
    pub source_gap: u64,
    /// Blocks fetched but not yet applied locally.
    pub apply_gap: u64,
}

/// Synchronization progress reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncProgress {
    /// `true` once the local view is current with the remote tip.
    pub synced: bool,
    /// Gap metrics, when the backend reports them.
    pub lag: Option<SyncLag>,
}

// ---------------------------------------------------------------------------
// WalletState
// ---------------------------------------------------------------------------

/// Immutable snapshot of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalletState {
    /// Balances keyed by token.
    pub balances: BTreeMap<TokenType, u128>,
    /// Sync progress. `None` until the backend has reported any.
    pub sync_progress: Option<SyncProgress>,
    /// The wallet's address, derived from its seed.
    pub address: String,
}

impl WalletState {
    /// Balance of `token`, zero when the token is absent.
    pub fn balance(&self, token: &TokenType) -> u128 {
        self.balances.get(token).copied().unwrap_or(0)
    }

    /// Balance of the native token.
    pub fn native_balance(&self) -> u128 {
        self.balance(&TokenType::native())
    }

    /// `true` only when sync progress is present and reports `synced`.
    pub fn is_synced(&self) -> bool {
        self.sync_progress.is_some_and(|p| p.synced)
    }

    /// The lag metrics, if any were reported.
    pub fn lag(&self) -> Option<SyncLag> {
        self.sync_progress.and_then(|p| p.lag)
    }
}

// ---------------------------------------------------------------------------
// TransferOutput
// ---------------------------------------------------------------------------

/// One output of a transfer handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutput {
    pub amount: u128,
    pub receiver_address: String,
    pub token: TokenType,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
