//! Run configuration for the wallet orchestration layer.
//!
//! - [`Endpoints`] -- indexer, prover and node URLs a wallet is bound to
//! - [`RunConfig`] -- everything a one-shot run needs: network, seeds,
//!   recipient, transfer amount and timing policy
//! - [`constants`] -- defaults for all of the above
//!
//! Configuration is resolved once and passed explicitly; nothing here is
//! process-global. [`RunConfig::load`] merges the process environment with
//! a dotenv file (file values win) without mutating the environment.
//! [`RunConfig::from_vars`] is the pure core and takes any key/value
//! iterator.

pub mod constants;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use sdk_core::{NetworkId, Seed};
use tracing::{debug, info};

use constants::{
    DEFAULT_FUNDS_SAMPLE_INTERVAL, DEFAULT_INDEXER_HTTP, DEFAULT_INDEXER_WS, DEFAULT_NODE_URL,
    DEFAULT_PROVING_SERVER, DEFAULT_SETTLE_GRACE, DEFAULT_TRANSFER_AMOUNT,
};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Environment keys understood by [`RunConfig::from_vars`].
pub mod keys {
    pub const NETWORK_ID: &str = "NETWORK_ID";
    pub const INDEXER_HTTP: &str = "INDEXER_HTTP";
    pub const INDEXER_WS: &str = "INDEXER_WS";
    pub const PROVING_SERVER: &str = "PROVING_SERVER";
    pub const NODE_URL: &str = "NODE_URL";
    pub const WALLET_SEED: &str = "WALLET_SEED";
    /// Older name for [`WALLET_SEED`], read when it is unset.
    pub const MIDNIGHT_SEED: &str = "MIDNIGHT_SEED";
    /// Bare seed key accepted by the tool server after the two above.
    pub const SEED: &str = "SEED";
    pub const RECIPIENT_SEED: &str = "RECIPIENT_SEED";
    /// Older name for [`RECIPIENT_SEED`], read when it is unset.
    pub const WALLET_2: &str = "WALLET_2";
    pub const RECIPIENT_ADDRESS: &str = "RECIPIENT_ADDRESS";
    pub const TRANSFER_AMOUNT: &str = "TRANSFER_AMOUNT";
    pub const SETTLE_GRACE_SECS: &str = "SETTLE_GRACE_SECS";
    pub const FUNDS_SAMPLE_SECS: &str = "FUNDS_SAMPLE_SECS";
    pub const SYNC_TIMEOUT_SECS: &str = "SYNC_TIMEOUT_SECS";
    pub const FUNDS_TIMEOUT_SECS: &str = "FUNDS_TIMEOUT_SECS";
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Network endpoints a wallet backend connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Indexer GraphQL over HTTP.
    pub indexer_http: String,
    /// Indexer GraphQL subscriptions over websocket.
    pub indexer_ws: String,
    /// Proof server.
    pub prover: String,
    /// Node RPC.
    pub node: String,
}

impl Endpoints {
    /// Public testnet endpoints with a local proof server.
    pub fn testnet() -> Self {
        Self {
            indexer_http: DEFAULT_INDEXER_HTTP.to_owned(),
            indexer_ws: DEFAULT_INDEXER_WS.to_owned(),
            prover: DEFAULT_PROVING_SERVER.to_owned(),
            node: DEFAULT_NODE_URL.to_owned(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::testnet()
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Where the primary seed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// Read from configuration.
    Configured,
    /// No seed was configured; a random one was generated for this run.
    Generated,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub network: NetworkId,
    pub endpoints: Endpoints,
    /// Seed of the sending wallet.
    pub primary_seed: Seed,
    pub seed_source: SeedSource,
    /// Seed of an optional recipient wallet we also control.
    pub secondary_seed: Option<Seed>,
    /// Static recipient used when no secondary seed is configured.
    pub recipient_address: Option<String>,
    /// Amount to transfer; always non-zero.
    pub transfer_amount: u128,
    /// Pause after submitting when there is no recipient wallet to watch.
    pub settle_grace: Duration,
    /// Minimum spacing between funds-wait evaluations.
    pub funds_sample_interval: Duration,
    /// Upper bound on a sync wait. `None` waits indefinitely.
    pub sync_timeout: Option<Duration>,
    /// Upper bound on a funds wait. `None` waits indefinitely.
    pub funds_timeout: Option<Duration>,
}

impl RunConfig {
    /// Loads configuration from the process environment merged with the
    /// dotenv file at `path`. Values from the file take precedence.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Dotenv`] if the file exists but cannot be
    /// parsed, or any error from [`RunConfig::from_vars`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut vars: HashMap<String, String> = std::env::vars().collect();

        match dotenvy::from_path_iter(path.as_ref()) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|e| ConfigError::Dotenv(e.to_string()))?;
                    vars.insert(key, value);
                }
            }
            Err(e) if e.not_found() => {
                debug!(path = %path.as_ref().display(), "no dotenv file, using process environment");
            }
            Err(e) => return Err(ConfigError::Dotenv(e.to_string())),
        }

        Self::from_vars(vars)
    }

    /// Resolves configuration from key/value pairs.
    ///
    /// Empty values count as unset. A missing primary seed is replaced by
    /// a freshly generated one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for non-numeric or zero
    /// amounts and durations.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_owned());
        let get_any = |names: &[&str]| names.iter().find_map(|key| get(*key));

        let network = match get(keys::NETWORK_ID).as_deref().and_then(NetworkId::parse) {
            Some(network) => network,
            None => {
                info!("no usable {} specified, defaulting to testnet", keys::NETWORK_ID);
                NetworkId::TestNet
            }
        };

        let defaults = Endpoints::testnet();
        let endpoints = Endpoints {
            indexer_http: get(keys::INDEXER_HTTP).unwrap_or(defaults.indexer_http),
            indexer_ws: get(keys::INDEXER_WS).unwrap_or(defaults.indexer_ws),
            prover: get(keys::PROVING_SERVER).unwrap_or(defaults.prover),
            node: get(keys::NODE_URL).unwrap_or(defaults.node),
        };

        let (primary_seed, seed_source) = match get_any(&[keys::WALLET_SEED, keys::MIDNIGHT_SEED]) {
            Some(seed) => (Seed::new(seed), SeedSource::Configured),
            None => (Seed::generate(), SeedSource::Generated),
        };

        let transfer_amount = match get(keys::TRANSFER_AMOUNT) {
            Some(raw) => parse_positive(keys::TRANSFER_AMOUNT, &raw)?,
            None => DEFAULT_TRANSFER_AMOUNT,
        };

        Ok(Self {
            network,
            endpoints,
            primary_seed,
            seed_source,
            secondary_seed: get_any(&[keys::RECIPIENT_SEED, keys::WALLET_2]).map(Seed::new),
            recipient_address: get(keys::RECIPIENT_ADDRESS),
            transfer_amount,
            settle_grace: parse_secs(keys::SETTLE_GRACE_SECS, get(keys::SETTLE_GRACE_SECS))?
                .unwrap_or(DEFAULT_SETTLE_GRACE),
            funds_sample_interval: parse_secs(
                keys::FUNDS_SAMPLE_SECS,
                get(keys::FUNDS_SAMPLE_SECS),
            )?
            .unwrap_or(DEFAULT_FUNDS_SAMPLE_INTERVAL),
            sync_timeout: parse_secs(keys::SYNC_TIMEOUT_SECS, get(keys::SYNC_TIMEOUT_SECS))?,
            funds_timeout: parse_secs(keys::FUNDS_TIMEOUT_SECS, get(keys::FUNDS_TIMEOUT_SECS))?,
        })
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u128, ConfigError> {
    match raw.parse::<u128>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
        }),
        Ok(n) => Ok(n),
    }
}

fn parse_secs(key: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    raw.map(|raw| {
        let secs = parse_positive(key, &raw)?;
        u64::try_from(secs)
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw })
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors from resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The dotenv file exists but could not be read or parsed.
    Dotenv(String),

    /// A key holds a value that is not a positive integer.
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dotenv(e) => write!(f, "dotenv error: {e}"),
            Self::InvalidValue { key, value } => {
                write!(f, "{key} must be a positive integer, got {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn no_vars() -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    #[test]
    fn defaults_when_nothing_configured() {
        let config = RunConfig::from_vars(no_vars()).unwrap();
        assert_eq!(config.network, NetworkId::TestNet);
        assert_eq!(config.endpoints, Endpoints::testnet());
        assert_eq!(config.seed_source, SeedSource::Generated);
        assert!(config.secondary_seed.is_none());
        assert!(config.recipient_address.is_none());
        assert_eq!(config.transfer_amount, DEFAULT_TRANSFER_AMOUNT);
        assert_eq!(config.settle_grace, DEFAULT_SETTLE_GRACE);
        assert_eq!(config.funds_sample_interval, DEFAULT_FUNDS_SAMPLE_INTERVAL);
        assert!(config.sync_timeout.is_none());
        assert!(config.funds_timeout.is_none());
    }

    #[test]
    fn configured_values_override_defaults() {
        let config = RunConfig::from_vars([
            (keys::NETWORK_ID, "Undeployed"),
            (keys::INDEXER_HTTP, "http://127.0.0.1:8088/api/v1/graphql"),
            (keys::PROVING_SERVER, "http://127.0.0.1:6300"),
            (keys::WALLET_SEED, "00ff"),
            (keys::RECIPIENT_SEED, "ff00"),
            (keys::RECIPIENT_ADDRESS, "addr_test1xyz"),
            (keys::TRANSFER_AMOUNT, "25"),
            (keys::SYNC_TIMEOUT_SECS, "90"),
        ])
        .unwrap();

        assert_eq!(config.network, NetworkId::Undeployed);
        assert_eq!(
            config.endpoints.indexer_http,
            "http://127.0.0.1:8088/api/v1/graphql"
        );
        assert_eq!(config.endpoints.prover, "http://127.0.0.1:6300");
        assert_eq!(config.endpoints.node, DEFAULT_NODE_URL);
        assert_eq!(config.primary_seed.expose(), "00ff");
        assert_eq!(config.seed_source, SeedSource::Configured);
        assert_eq!(config.secondary_seed.unwrap().expose(), "ff00");
        assert_eq!(config.recipient_address.as_deref(), Some("addr_test1xyz"));
        assert_eq!(config.transfer_amount, 25);
        assert_eq!(config.sync_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn older_seed_keys_are_accepted() {
        let config =
            RunConfig::from_vars([(keys::MIDNIGHT_SEED, "00ff"), (keys::WALLET_2, "ff00")]).unwrap();
        assert_eq!(config.seed_source, SeedSource::Configured);
        assert_eq!(config.primary_seed.expose(), "00ff");
        assert_eq!(config.secondary_seed.unwrap().expose(), "ff00");
    }

    #[test]
    fn current_seed_keys_win_over_older_ones() {
        let config = RunConfig::from_vars([
            (keys::WALLET_SEED, "aa"),
            (keys::MIDNIGHT_SEED, "bb"),
            (keys::RECIPIENT_SEED, "cc"),
            (keys::WALLET_2, "dd"),
        ])
        .unwrap();
        assert_eq!(config.primary_seed.expose(), "aa");
        assert_eq!(config.secondary_seed.unwrap().expose(), "cc");
    }

    #[test]
    fn empty_current_key_falls_through_to_older_one() {
        let config =
            RunConfig::from_vars([(keys::WALLET_SEED, " "), (keys::MIDNIGHT_SEED, "0a0b")]).unwrap();
        assert_eq!(config.seed_source, SeedSource::Configured);
        assert_eq!(config.primary_seed.expose(), "0a0b");
    }

    #[test]
    fn unknown_network_falls_back_to_testnet() {
        let config = RunConfig::from_vars([(keys::NETWORK_ID, "mainnet")]).unwrap();
        assert_eq!(config.network, NetworkId::TestNet);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config =
            RunConfig::from_vars([(keys::WALLET_SEED, "  "), (keys::RECIPIENT_SEED, "")]).unwrap();
        assert_eq!(config.seed_source, SeedSource::Generated);
        assert!(config.secondary_seed.is_none());
    }

    #[test]
    fn zero_amount_rejected() {
        let err = RunConfig::from_vars([(keys::TRANSFER_AMOUNT, "0")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: keys::TRANSFER_AMOUNT,
                value: "0".into()
            }
        );
    }

    #[test]
    fn non_numeric_duration_rejected() {
        let err = RunConfig::from_vars([(keys::SETTLE_GRACE_SECS, "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: keys::SETTLE_GRACE_SECS,
                ..
            }
        ));
    }

    #[test]
    fn dotenv_file_values_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FUNDS_SAMPLE_SECS=2").unwrap();
        writeln!(file, "RECIPIENT_ADDRESS=addr_test1fromfile").unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.funds_sample_interval, Duration::from_secs(2));
        assert_eq!(
            config.recipient_address.as_deref(),
            Some("addr_test1fromfile")
        );
    }

    #[test]
    fn missing_dotenv_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunConfig::load(dir.path().join("absent.env")).is_ok());
    }

    #[test]
    fn error_display() {
        let err = ConfigError::InvalidValue {
            key: keys::TRANSFER_AMOUNT,
            value: "x".into(),
        };
        assert_eq!(
            err.to_string(),
            "TRANSFER_AMOUNT must be a positive integer, got \"x\""
        );
    }
}
