//! Wallet address encoding and decoding.
//!
//! An address is the Bech32m encoding of a wallet's 32-byte public key
//! with a human-readable part (HRP) identifying the network.
//!
//! | Network      | HRP               |
//! |--------------|-------------------|
//! | `Undeployed` | `addr_undeployed` |
//! | `TestNet`    | `addr_test`       |
//!
//! ```rust
//! use sdk_core::{NetworkId, WalletAddress};
//!
//! let address = WalletAddress::from_key(NetworkId::TestNet, [0x11; 32]);
//! let encoded = address.encode();
//! assert!(encoded.starts_with("addr_test1"));
//!
//! let parsed = WalletAddress::parse(&encoded).unwrap();
//! assert_eq!(parsed, address);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32m, Hrp};

use crate::NetworkId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the encoded public key.
pub const KEY_LEN: usize = 32;

/// Human-readable part for undeployed (local) addresses.
pub const HRP_UNDEPLOYED: &str = "addr_undeployed";

/// Human-readable part for testnet addresses.
pub const HRP_TESTNET: &str = "addr_test";

// ---------------------------------------------------------------------------
// WalletAddress
// ---------------------------------------------------------------------------

/// A network-qualified wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress {
    network: NetworkId,
    key: [u8; KEY_LEN],
}

impl WalletAddress {
    /// Creates an address from a network and public key.
    pub fn from_key(network: NetworkId, key: [u8; KEY_LEN]) -> Self {
        Self { network, key }
    }

    /// Returns the network this address belongs to.
    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Returns the encoded public key.
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Returns the HRP for this address's network.
    pub fn hrp(&self) -> &'static str {
        match self.network {
            NetworkId::Undeployed => HRP_UNDEPLOYED,
            NetworkId::TestNet => HRP_TESTNET,
        }
    }

    /// Encodes this address as a lowercase Bech32m string.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parses an address from a Bech32m string (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid Bech32m, the HRP does
    /// not match a known network, or the payload is not exactly
    /// [`KEY_LEN`] bytes.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let normalized: Cow<'_, str> = if s.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(s.to_lowercase())
        } else {
            Cow::Borrowed(s)
        };

        let checked = CheckedHrpstring::new::<Bech32m>(&normalized)
            .map_err(|e| AddressError::Bech32(e.to_string()))?;

        let network = match checked.hrp().as_str() {
            HRP_UNDEPLOYED => NetworkId::Undeployed,
            HRP_TESTNET => NetworkId::TestNet,
            other => return Err(AddressError::UnknownNetwork(other.to_string())),
        };

        let key: [u8; KEY_LEN] = checked
            .byte_iter()
            .collect::<Vec<u8>>()
            .try_into()
            .map_err(|_| AddressError::BadLength)?;

        Ok(Self { network, key })
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = Hrp::parse(self.hrp()).map_err(|_| fmt::Error)?;
        bech32::encode_lower_to_fmt::<Bech32m, _>(f, hrp, &self.key).map_err(|_| fmt::Error)
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur when parsing addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Bech32m decoding failed.
    Bech32(String),

    /// The HRP does not match any known network.
    UnknownNetwork(String),

    /// The payload is not a 32-byte key.
    BadLength,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bech32(e) => write!(f, "bech32 error: {e}"),
            Self::UnknownNetwork(hrp) => write!(f, "unknown network prefix: {hrp}"),
            Self::BadLength => write!(f, "address payload must be {KEY_LEN} bytes"),
        }
    }
}

impl std::error::Error for AddressError {}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encodes a public key as an address string.
pub fn encode_address(network: NetworkId, key: &[u8; KEY_LEN]) -> String {
    WalletAddress::from_key(network, *key).encode()
}

/// Decodes an address string into its components.
pub fn decode_address(address: &str) -> Result<(NetworkId, [u8; KEY_LEN]), AddressError> {
    let addr = WalletAddress::parse(address)?;
    Ok((addr.network, addr.key))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
