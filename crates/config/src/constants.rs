//! Default endpoints and timing policy.

use std::time::Duration;

/// Default indexer GraphQL HTTP endpoint.
pub const DEFAULT_INDEXER_HTTP: &str = "https://indexer.testnet-02.midnight.network/api/v1/graphql";

/// Default indexer GraphQL websocket endpoint.
pub const DEFAULT_INDEXER_WS: &str =
    "wss://indexer.testnet-02.midnight.network/api/v1/graphql/ws";

/// Default proof server. Proving runs locally by default.
pub const DEFAULT_PROVING_SERVER: &str = "http://localhost:6300";

/// Default node RPC endpoint.
pub const DEFAULT_NODE_URL: &str = "https://rpc.testnet-02.midnight.network";

/// Amount moved by a one-shot run, in the native token's base unit.
pub const DEFAULT_TRANSFER_AMOUNT: u128 = 1;

/// Minimum spacing between two funds-wait evaluations.
pub const DEFAULT_FUNDS_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Grace period after submitting when there is no recipient wallet to watch.
pub const DEFAULT_SETTLE_GRACE: Duration = Duration::from_secs(3);

/// Name of the dotenv file read next to the working directory.
pub const DOTENV_FILE: &str = ".env";
