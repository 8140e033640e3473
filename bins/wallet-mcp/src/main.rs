//! Tool server exposing a wallet session over stdio.
//!
//! Speaks newline-delimited JSON-RPC 2.0: `initialize`, `tools/list` and
//! `tools/call` for `set_seed`, `get_balance`, `get_address` and
//! `transfer_funds`. Stdout carries protocol frames only; logs go to stderr.
//!
//! # Configuration
//!
//! The server can start with an active wallet. The initial seed is taken from
//! `WALLET_SEED`, then `MIDNIGHT_SEED`, then `SEED`, then a `--seed=<hex>`
//! argument. Network and
//! timing settings are read the same way as the runner's (environment plus
//! `.env`). `SIM_GENESIS_FUNDS` credits the initial wallet on the simulated
//! ledger.
//!
//! ```bash
//! WALLET_SEED=<hex> RUST_LOG=debug cargo run -p wallet-mcp
//! ```

mod protocol;
mod tools;

use std::process::ExitCode;

use config::{RunConfig, keys};
use config::constants::DOTENV_FILE;
use sdk::session::WalletSession;
use sdk::sim::{SimBackend, SimLedger, derive_address};
use sdk::{Sdk, SdkConfig};
use sdk_core::Seed;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::protocol::parse_line;
use crate::tools::ToolServer;

const GENESIS_FUNDS_KEY: &str = "SIM_GENESIS_FUNDS";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let run_config = match RunConfig::load(DOTENV_FILE) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let initial = initial_seed(std::env::args().skip(1));
    let ledger = SimLedger::new();
    if let Some((seed, _)) = &initial {
        let funds = std::env::var(GENESIS_FUNDS_KEY)
            .ok()
            .and_then(|raw| raw.trim().parse::<u128>().ok())
            .unwrap_or(0);
        if funds > 0 {
            match derive_address(seed, run_config.network) {
                Ok(address) => ledger.fund(&address, funds),
                Err(e) => tracing::warn!(error = %e, "not crediting genesis funds"),
            }
        }
    }

    let cancel = CancellationToken::new();
    let sdk = Sdk::new(
        SdkConfig::from_run_config(&run_config),
        SimBackend::new(ledger),
        cancel.clone(),
    );
    let server = ToolServer::new(WalletSession::new(sdk));

    if let Some((seed, origin)) = initial {
        if let Err(e) = server.session().set_seed(seed).await {
            tracing::error!(error = %e, "failed to initialise wallet from provided seed");
            return ExitCode::FAILURE;
        }
        tracing::info!("wallet initialised from {origin}");
    }

    tracing::info!("wallet-mcp listening on stdio");
    let result = tokio::select! {
        result = serve(&server) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
            Ok(())
        }
    };
    cancel.cancel();

    if let Err(e) = server.session().shutdown().await {
        tracing::warn!(error = %e, "failed to close wallet");
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "stdio transport failed");
            ExitCode::FAILURE
        }
    }
}

/// Reads requests until stdin closes.
async fn serve<B: sdk::WalletBackend>(server: &ToolServer<B>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match parse_line(&line) {
            Ok(request) => server.handle(request).await,
            Err(error) => Some(error),
        };
        let Some(response) = response else {
            continue;
        };

        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        stdout.write_all(&frame).await?;
        stdout.flush().await?;
    }
    tracing::info!("stdin closed");
    Ok(())
}

/// Resolves the seed to start with and where it came from.
fn initial_seed(args: impl IntoIterator<Item = String>) -> Option<(Seed, &'static str)> {
    seed_from(|key| std::env::var(key).ok(), args)
}

fn seed_from(
    lookup: impl Fn(&str) -> Option<String>,
    args: impl IntoIterator<Item = String>,
) -> Option<(Seed, &'static str)> {
    let from_env = [keys::WALLET_SEED, keys::MIDNIGHT_SEED, keys::SEED]
        .iter()
        .find_map(|key| lookup(*key).filter(|v| !v.trim().is_empty()));
    if let Some(seed) = from_env {
        return Some((Seed::new(seed.trim()), "environment variable"));
    }
    args.into_iter()
        .find_map(|arg| arg.strip_prefix("--seed=").map(str::to_owned))
        .filter(|seed| !seed.is_empty())
        .map(|seed| (Seed::new(seed), "command-line argument"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn older_seed_key_is_read_from_environment() {
        let (seed, source) = seed_from(env(&[("MIDNIGHT_SEED", "00ff")]), Vec::new()).unwrap();
        assert_eq!(seed.expose(), "00ff");
        assert_eq!(source, "environment variable");
    }

    #[test]
    fn environment_keys_are_checked_in_order() {
        let lookup = env(&[("WALLET_SEED", "aa"), ("MIDNIGHT_SEED", "bb"), ("SEED", "cc")]);
        assert_eq!(seed_from(lookup, Vec::new()).unwrap().0.expose(), "aa");

        let lookup = env(&[("MIDNIGHT_SEED", " "), ("SEED", "cc")]);
        assert_eq!(seed_from(lookup, Vec::new()).unwrap().0.expose(), "cc");
    }

    #[test]
    fn argument_is_used_without_environment_seed() {
        let args = vec!["--verbose".to_owned(), "--seed=0a0b".to_owned()];
        let (seed, source) = seed_from(env(&[]), args).unwrap();
        assert_eq!(seed.expose(), "0a0b");
        assert_eq!(source, "command-line argument");

        assert!(seed_from(env(&[]), vec!["--seed=".to_owned()]).is_none());
    }
}
