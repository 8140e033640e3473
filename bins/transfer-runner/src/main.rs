//! One-shot transfer run.
//!
//! Loads configuration from the environment and `.env`, then builds the
//! primary wallet, waits for it to sync and hold funds, sends the configured
//! amount to the recipient, confirms receipt and reports balances before and
//! after. Every wallet is closed before the process exits.
//!
//! The wallets run against the in-process simulated ledger. The primary
//! wallet's address is credited `SIM_GENESIS_FUNDS` (process environment
//! only, default 10) at startup. Set it to `0` to watch the run wait for
//! funds.
//!
//! # Configuration
//!
//! ```bash
//! export WALLET_SEED=<hex>          # or MIDNIGHT_SEED; generated (and logged) when unset
//! export RECIPIENT_SEED=<hex>       # or WALLET_2; recipient wallet to confirm receipt on
//! export RECIPIENT_ADDRESS=<bech32> # used when RECIPIENT_SEED is unset
//! RUST_LOG=info cargo run --release -p transfer-runner
//! ```

use std::process::ExitCode;

use config::constants::DOTENV_FILE;
use config::{RunConfig, SeedSource};
use sdk::orchestrator::{RunOrchestrator, RunPlan};
use sdk::sim::{SimBackend, SimLedger, derive_address};
use sdk::{Sdk, SdkConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const GENESIS_FUNDS_KEY: &str = "SIM_GENESIS_FUNDS";
const DEFAULT_GENESIS_FUNDS: u128 = 10;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("transfer-runner starting");

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    let run_config = match RunConfig::load(DOTENV_FILE) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run_config.seed_source {
        SeedSource::Configured => {
            tracing::info!(seed = run_config.primary_seed.expose(), "primary wallet seed");
        }
        SeedSource::Generated => tracing::info!(
            seed = run_config.primary_seed.expose(),
            "no WALLET_SEED configured, generated a new primary seed (keep it to reuse the wallet)"
        ),
    }
    if let Some(seed) = &run_config.secondary_seed {
        tracing::info!(seed = seed.expose(), "recipient wallet seed");
    }

    let genesis_funds = match genesis_funds() {
        Ok(amount) => amount,
        Err(raw) => {
            tracing::error!(value = %raw, "{GENESIS_FUNDS_KEY} must be a non-negative integer");
            return ExitCode::FAILURE;
        }
    };

    // -----------------------------------------------------------------------
    // Simulated ledger
    // -----------------------------------------------------------------------

    let primary_address = match derive_address(&run_config.primary_seed, run_config.network) {
        Ok(address) => address,
        Err(e) => {
            tracing::error!(error = %e, "primary seed is unusable");
            return ExitCode::FAILURE;
        }
    };
    let ledger = SimLedger::new();
    if genesis_funds > 0 {
        ledger.fund(&primary_address, genesis_funds);
    }
    tracing::info!(%primary_address, funds = %genesis_funds, "simulated ledger ready");

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    let cancel = CancellationToken::new();
    let sdk = Sdk::new(
        SdkConfig::from_run_config(&run_config),
        SimBackend::new(ledger),
        cancel.clone(),
    );
    let orchestrator = RunOrchestrator::new(sdk, RunPlan::from_config(&run_config));

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, cancelling run");
            ctrl_c_cancel.cancel();
        }
    });

    let result = orchestrator.run().await;

    match result {
        Ok(summary) => {
            tracing::info!(
                tx_id = %summary.receipt.tx_id,
                recipient = %summary.recipient,
                confirmed = summary.confirmed,
                "transfer-runner finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Reads the genesis credit for the primary wallet. Returns the raw value
/// when it does not parse.
fn genesis_funds() -> Result<u128, String> {
    match std::env::var(GENESIS_FUNDS_KEY) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| raw),
        _ => Ok(DEFAULT_GENESIS_FUNDS),
    }
}
