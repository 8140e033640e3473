//! Core types shared by the wallet orchestration crates.
//!
//! - [`NetworkId`] -- which ledger network a wallet is bound to
//! - [`Seed`] -- the secret that determines a wallet's identity
//! - [`WalletState`] -- an immutable snapshot published by a wallet backend
//! - [`TransferOutput`] -- a single output handed to the backend when
//!   preparing a transfer
//! - [`WalletAddress`] -- Bech32m address encoding
//!
//! This crate does no I/O and has no async runtime dependency, so it can be
//! used freely as a leaf dependency.

pub mod address;
pub mod state;

pub use address::{AddressError, WalletAddress, decode_address, encode_address};
pub use state::{SyncLag, SyncProgress, TokenType, TransferOutput, WalletState};

use std::fmt;

// ---------------------------------------------------------------------------
// NetworkId
// ---------------------------------------------------------------------------

/// Ledger network identifier.
///
/// Determines the address prefix and which endpoints a wallet talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NetworkId {
    /// Local, undeployed development network.
    Undeployed,

    /// Public test network.
    #[default]
    TestNet,
}

impl NetworkId {
    /// Parses a network name case-insensitively.
    ///
    /// Returns `None` for empty or unrecognized input; callers decide the
    /// fallback (the configuration layer defaults to [`NetworkId::TestNet`]).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "undeployed" => Some(Self::Undeployed),
            "testnet" => Some(Self::TestNet),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Undeployed => "undeployed",
            Self::TestNet => "testnet",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// Number of random bytes in a generated seed.
pub const SEED_LEN: usize = 32;

/// Wallet seed: a hex-encoded secret.
///
/// The seed is the sole input determining wallet identity and derived
/// address. Its `Debug` output is redacted so it never lands in logs by
/// accident; use [`Seed::expose`] when the raw value is really needed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Seed(String);

impl Seed {
    /// Wraps a seed string as-is. Validation is the backend's job.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random seed from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SEED_LEN];
        rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut bytes);
        Self(hex::encode(bytes))
    }

    /// Returns the raw seed string.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Decodes the seed into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(self.0.trim())
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
