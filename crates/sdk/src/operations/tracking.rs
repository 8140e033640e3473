//! Step-by-step records of transfers and runs.
//!
//! A transfer or a full run opens an [`Operation`] in the configured
//! [`OperationStore`], appends one [`StepRecord`] per step as it finishes,
//! and closes the operation with its final [`OperationStatus`]. The ID ends
//! up in receipts and run summaries so callers can read the record back
//! with `Sdk::query_operation`.
//!
//! The SDK starts with [`NoopOperationStore`]; swap in
//! [`InMemoryOperationStore`] to keep records.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::SdkError;

// ---------------------------------------------------------------------------
// Identifiers and labels
// ---------------------------------------------------------------------------

/// Process-unique operation identifier, shown as `op-<n>` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

static NEXT_OPERATION: AtomicU64 = AtomicU64::new(1);

impl OperationId {
    fn allocate() -> Self {
        Self(NEXT_OPERATION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationKind {
    /// Balance check, prepare, prove and submit for one payment.
    Transfer,
    /// Readiness, transfer and confirmation across one or two wallets.
    Run,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Run => "run",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
}

impl OperationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Steps recorded for transfers (`BalanceCheck` to `Submit`) and runs
/// (`PrimaryReady` to `Report`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationStep {
    BalanceCheck,
    Prepare,
    Prove,
    Submit,
    PrimaryReady,
    PrimaryFunds,
    SecondaryReady,
    ResolveRecipient,
    Transfer,
    /// Waiting for the recipient balance, or the settle grace period.
    Confirm,
    Report,
}

impl OperationStep {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BalanceCheck => "balance_check",
            Self::Prepare => "prepare",
            Self::Prove => "prove",
            Self::Submit => "submit",
            Self::PrimaryReady => "primary_ready",
            Self::PrimaryFunds => "primary_funds",
            Self::SecondaryReady => "secondary_ready",
            Self::ResolveRecipient => "resolve_recipient",
            Self::Transfer => "transfer",
            Self::Confirm => "confirm",
            Self::Report => "report",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

display_as_str!(OperationKind, OperationStatus, OperationStep);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Ok,
    Failed(SdkError),
    /// The step did not apply, e.g. the primary wallet already held funds.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: OperationStep,
    pub outcome: StepOutcome,
    pub finished_at: Instant,
    /// `None` for skipped steps.
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub steps: Vec<StepRecord>,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
}

impl Operation {
    /// First record for `step`, if it ran.
    pub fn step(&self, step: OperationStep) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.step == step)
    }

    pub fn step_names(&self) -> Vec<OperationStep> {
        self.steps.iter().map(|record| record.step).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|record| matches!(record.outcome, StepOutcome::Failed(_)))
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Where operation records go. Calls arrive in order: `open`, any number
/// of `append`, then `close`.
pub trait OperationStore: Send + Sync {
    fn open(&self, op: Operation);

    fn append(&self, id: OperationId, record: StepRecord);

    fn close(&self, id: OperationId, status: OperationStatus);

    fn get(&self, id: OperationId) -> Option<Operation>;

    /// Operations opened but not yet closed.
    fn in_flight(&self) -> Vec<Operation>;
}

/// Discards everything.
pub struct NoopOperationStore;

impl OperationStore for NoopOperationStore {
    fn open(&self, _op: Operation) {}

    fn append(&self, _id: OperationId, _record: StepRecord) {}

    fn close(&self, _id: OperationId, _status: OperationStatus) {}

    fn get(&self, _id: OperationId) -> Option<Operation> {
        None
    }

    fn in_flight(&self) -> Vec<Operation> {
        Vec::new()
    }
}

/// Keeps every operation in memory, in the order they were opened.
#[derive(Default)]
pub struct InMemoryOperationStore {
    ops: Mutex<Vec<Operation>>,
}

impl InMemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_kind(&self, kind: OperationKind) -> Vec<Operation> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| op.kind == kind)
            .cloned()
            .collect()
    }

    fn with_op(&self, id: OperationId, f: impl FnOnce(&mut Operation)) {
        if let Some(op) = self.ops.lock().unwrap().iter_mut().find(|op| op.id == id) {
            f(op);
        }
    }
}

impl OperationStore for InMemoryOperationStore {
    fn open(&self, op: Operation) {
        self.ops.lock().unwrap().push(op);
    }

    fn append(&self, id: OperationId, record: StepRecord) {
        self.with_op(id, |op| op.steps.push(record));
    }

    fn close(&self, id: OperationId, status: OperationStatus) {
        self.with_op(id, |op| {
            op.status = status;
            op.finished_at = Some(Instant::now());
        });
    }

    fn get(&self, id: OperationId) -> Option<Operation> {
        self.ops.lock().unwrap().iter().find(|op| op.id == id).cloned()
    }

    fn in_flight(&self) -> Vec<Operation> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| op.status == OperationStatus::InProgress)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// OperationTracker
// ---------------------------------------------------------------------------

/// Write handle for one open operation.
pub(crate) struct OperationTracker {
    store: Arc<dyn OperationStore>,
    id: OperationId,
}

impl OperationTracker {
    pub fn start(store: Arc<dyn OperationStore>, kind: OperationKind) -> Self {
        let id = OperationId::allocate();
        store.open(Operation {
            id,
            kind,
            status: OperationStatus::InProgress,
            steps: Vec::new(),
            started_at: Instant::now(),
            finished_at: None,
        });
        Self { store, id }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    fn append(&self, step: OperationStep, outcome: StepOutcome, duration: Option<Duration>) {
        self.store.append(
            self.id,
            StepRecord {
                step,
                outcome,
                finished_at: Instant::now(),
                duration,
            },
        );
    }

    pub fn step_skipped(&mut self, step: OperationStep) {
        self.append(step, StepOutcome::Skipped, None);
    }

    /// Records `result` as the outcome of `step` and returns it unchanged.
    pub fn step<T>(
        &mut self,
        step: OperationStep,
        started: Instant,
        result: Result<T, SdkError>,
    ) -> Result<T, SdkError> {
        let outcome = match &result {
            Ok(_) => StepOutcome::Ok,
            Err(e) => StepOutcome::Failed(e.clone()),
        };
        self.append(step, outcome, Some(started.elapsed()));
        result
    }

    /// Closes the operation with a status matching `result`.
    pub fn finish<T>(self, result: Result<T, SdkError>) -> Result<T, SdkError> {
        let status = if result.is_ok() {
            OperationStatus::Succeeded
        } else {
            OperationStatus::Failed
        };
        self.store.close(self.id, status);
        result
    }
}
