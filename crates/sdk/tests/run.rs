//! Integration tests: full runs and sessions over the simulated backend.
//!
//! Every test runs on paused tokio time, so sync steps, proving delays,
//! funds sampling and the settle grace period all elapse instantly.
//!
//! ```bash
//! cargo test -p sdk --test run
//! ```

use std::sync::Arc;
use std::time::Duration;

use sdk::orchestrator::{RunOrchestrator, RunPlan};
use sdk::report::{BalanceLine, RecordingReporter, ReportStage};
use sdk::session::WalletSession;
use sdk::sim::{SimBackend, SimFault, SimLedger, derive_address};
use sdk::{Sdk, SdkConfig, SdkError};
use sdk_core::{NetworkId, Seed};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed(byte: u8) -> Seed {
    Seed::new(hex::encode([byte; 32]))
}

fn address(byte: u8) -> String {
    derive_address(&seed(byte), NetworkId::TestNet).unwrap()
}

fn backend(ledger: &SimLedger) -> SimBackend {
    SimBackend::new(ledger.clone())
        .with_sync_steps(2)
        .with_step_delay(Duration::from_millis(100))
}

fn sim_sdk(backend: SimBackend) -> (Sdk<SimBackend>, Arc<RecordingReporter>) {
    let sdk = Sdk::new(SdkConfig::default(), backend, CancellationToken::new());
    let reporter = Arc::new(RecordingReporter::new());
    sdk.set_reporter(reporter.clone());
    (sdk, reporter)
}

fn plan(secondary: Option<Seed>, recipient: Option<String>, amount: u128) -> RunPlan {
    RunPlan {
        primary_seed: seed(1),
        secondary_seed: secondary,
        recipient_address: recipient,
        transfer_amount: amount,
        settle_grace: Duration::from_secs(3),
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn run_with_secondary_confirms_receipt() {
    let ledger = SimLedger::with_genesis([(address(1), 5)]);
    let (sdk, reporter) = sim_sdk(backend(&ledger));
    let run = RunOrchestrator::new(sdk.clone(), plan(Some(seed(2)), None, 1));

    let summary = run.run().await.unwrap();

    assert!(summary.confirmed);
    assert_eq!(summary.recipient, address(2));
    assert_eq!(summary.secondary_address.as_deref(), Some(address(2).as_str()));
    assert_eq!(
        summary.before,
        vec![BalanceLine::new("primary", 5), BalanceLine::new("secondary", 0)]
    );
    assert_eq!(
        summary.after,
        vec![BalanceLine::new("primary", 4), BalanceLine::new("secondary", 1)]
    );
    assert_eq!(reporter.balances_at(ReportStage::After), Some(summary.after.clone()));

    assert_eq!(ledger.balance_of(&address(1)), 4);
    assert_eq!(ledger.balance_of(&address(2)), 1);
    assert_eq!(sdk.backend().open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_with_static_recipient_settles() {
    let ledger = SimLedger::with_genesis([(address(1), 5)]);
    let (sdk, reporter) = sim_sdk(backend(&ledger));
    let run = RunOrchestrator::new(sdk.clone(), plan(None, Some(address(9)), 2));

    let summary = run.run().await.unwrap();

    assert!(!summary.confirmed);
    assert_eq!(summary.recipient, address(9));
    assert_eq!(ledger.balance_of(&address(9)), 2);
    assert!(
        reporter
            .notices()
            .iter()
            .any(|n| n.starts_with("no recipient wallet to watch"))
    );
    assert_eq!(sdk.backend().open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn unfunded_primary_waits_for_faucet() {
    let ledger = SimLedger::new();
    let (sdk, reporter) = sim_sdk(backend(&ledger));
    let run = RunOrchestrator::new(sdk.clone(), plan(None, Some(address(9)), 1));

    let handle = tokio::spawn(async move { run.run().await });
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!handle.is_finished());
    ledger.fund(&address(1), 3);

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.before, vec![BalanceLine::new("primary", 3)]);
    assert!(!reporter.progress().is_empty());
    assert_eq!(ledger.balance_of(&address(1)), 2);
}

#[tokio::test(start_paused = true)]
async fn insufficient_funds_leaves_ledger_untouched() {
    let ledger = SimLedger::with_genesis([(address(1), 2)]);
    let (sdk, _) = sim_sdk(backend(&ledger));
    let run = RunOrchestrator::new(sdk.clone(), plan(None, Some(address(9)), 5));

    assert_eq!(
        run.run().await.unwrap_err(),
        SdkError::InsufficientFunds {
            observed: 2,
            required: 5
        }
    );
    assert_eq!(ledger.balance_of(&address(1)), 2);
    assert_eq!(ledger.height(), 0);
    assert_eq!(sdk.backend().open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn secondary_confirmation_counts_from_its_prior_balance() {
    let ledger = SimLedger::with_genesis([(address(1), 5), (address(2), 10)]);
    let (sdk, _) = sim_sdk(backend(&ledger));
    let run = RunOrchestrator::new(sdk.clone(), plan(Some(seed(2)), None, 1));

    let summary = run.run().await.unwrap();

    assert_eq!(summary.before[1], BalanceLine::new("secondary", 10));
    assert_eq!(summary.after[1], BalanceLine::new("secondary", 11));
}

#[tokio::test(start_paused = true)]
async fn proving_failure_submits_nothing() {
    let ledger = SimLedger::with_genesis([(address(1), 5)]);
    let backend = backend(&ledger);
    backend.inject(SimFault::Prove);
    let (sdk, _) = sim_sdk(backend);
    let run = RunOrchestrator::new(sdk.clone(), plan(Some(seed(2)), None, 1));

    assert!(matches!(run.run().await, Err(SdkError::Proving(_))));
    assert_eq!(ledger.balance_of(&address(1)), 5);
    assert_eq!(ledger.balance_of(&address(2)), 0);
    assert_eq!(sdk.backend().open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_while_waiting_for_funds_closes_wallet() {
    let ledger = SimLedger::new();
    let (sdk, _) = sim_sdk(backend(&ledger));
    let run = RunOrchestrator::new(sdk.clone(), plan(None, Some(address(9)), 1));

    let handle = tokio::spawn(async move { run.run().await });
    tokio::time::sleep(Duration::from_secs(7)).await;
    sdk.shutdown();

    assert_eq!(handle.await.unwrap().unwrap_err(), SdkError::Cancelled);
    assert_eq!(sdk.backend().open_handles(), 0);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn building_one_seed_twice_yields_two_open_handles() {
    let ledger = SimLedger::with_genesis([(address(1), 5)]);
    let (sdk, _) = sim_sdk(backend(&ledger));

    let first = sdk.build_wallet(&seed(1)).await.unwrap();
    let second = sdk.build_wallet(&seed(1)).await.unwrap();
    assert_eq!(sdk.backend().open_handles(), 2);

    assert_eq!(sdk.wait_for_sync(&first).await.unwrap().native_balance(), 5);
    assert_eq!(sdk.wait_for_sync(&second).await.unwrap().native_balance(), 5);

    sdk.close_wallet(first).await.unwrap();
    assert_eq!(sdk.backend().open_handles(), 1);
    sdk.close_wallet(second).await.unwrap();
    assert_eq!(sdk.backend().open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn reopened_wallet_is_synced() {
    let ledger = SimLedger::with_genesis([(address(1), 5)]);
    let (sdk, _) = sim_sdk(backend(&ledger));

    let wallet = sdk.build_wallet(&seed(1)).await.unwrap();
    let wallet = sdk.reopen_wallet(&seed(1), Some(wallet)).await.unwrap();
    assert_eq!(sdk.backend().open_handles(), 1);

    let state = sdk.current_state(&wallet).await.unwrap();
    assert!(state.is_synced());
    assert_eq!(state.native_balance(), 5);
    sdk.close_wallet(wallet).await.unwrap();
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn session_sets_seed_and_transfers() {
    let ledger = SimLedger::with_genesis([(address(1), 5)]);
    let backend = SimBackend::new(ledger.clone()).with_sync_steps(0);
    let (sdk, _) = sim_sdk(backend);
    let session = WalletSession::new(sdk.clone());

    assert_eq!(session.balance().await, Err(SdkError::NoActiveWallet));

    session.set_seed(seed(1)).await.unwrap();
    assert_eq!(session.address().await.unwrap(), address(1));
    assert_eq!(session.balance().await.unwrap(), 5);

    let receipt = session.transfer(&address(3), "2").await.unwrap();
    assert_eq!(receipt.balance_before, 5);
    assert_eq!(ledger.balance_of(&address(3)), 2);

    session.set_seed(seed(3)).await.unwrap();
    assert_eq!(session.address().await.unwrap(), address(3));
    assert_eq!(sdk.backend().open_handles(), 1);

    session.shutdown().await.unwrap();
    assert_eq!(sdk.backend().open_handles(), 0);
}
