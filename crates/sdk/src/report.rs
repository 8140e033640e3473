//! Human-facing progress reporting.
//!
//! Operations emit three kinds of reports through a [`Reporter`]:
//! - Balance tables before and after a transfer
//! - One-line notices as a transfer moves through its stages
//! - Funds-wait progress samples
//!
//! [`TracingReporter`] writes them as `tracing` events and is the default.
//! [`RecordingReporter`] keeps them in memory for inspection.

use std::fmt;
use std::sync::Mutex;

use sdk_core::SyncLag;
use tracing::info;

// ---------------------------------------------------------------------------
// Report payloads
// ---------------------------------------------------------------------------

/// Which side of the transfer a balance report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Before,
    After,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "BEFORE"),
            Self::After => write!(f, "AFTER"),
        }
    }
}

/// One row of a balance report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub label: String,
    pub amount: u128,
}

impl BalanceLine {
    pub fn new(label: impl Into<String>, amount: u128) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// One throttled sample taken while waiting for funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundsProgress {
    pub synced: bool,
    /// `None` when the snapshot carries no sync lag.
    pub lag: Option<SyncLag>,
    pub balance: u128,
    pub target: u128,
}

impl fmt::Display for FundsProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "synced: {}", self.synced)?;
        if let Some(lag) = self.lag {
            write!(f, " (source gap {}, apply gap {})", lag.source_gap, lag.apply_gap)?;
        }
        write!(f, ", balance: {}/{}", self.balance, self.target)
    }
}

// ---------------------------------------------------------------------------
// Reporter trait
// ---------------------------------------------------------------------------

/// Sink for progress reports. Implementations must not block.
pub trait Reporter: Send + Sync {
    fn balances(&self, stage: ReportStage, lines: &[BalanceLine]);

    fn notice(&self, message: &str);

    fn funds_progress(&self, progress: &FundsProgress);
}

// ---------------------------------------------------------------------------
// TracingReporter
// ---------------------------------------------------------------------------

/// Writes reports as `tracing` events at `info`.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn balances(&self, stage: ReportStage, lines: &[BalanceLine]) {
        info!("=== BALANCES {stage} TRANSFER ===");
        for line in lines {
            info!(label = %line.label, amount = %line.amount, "balance");
        }
    }

    fn notice(&self, message: &str) {
        info!("{message}");
    }

    fn funds_progress(&self, progress: &FundsProgress) {
        let (source_gap, apply_gap) = progress
            .lag
            .map_or((None, None), |l| (Some(l.source_gap), Some(l.apply_gap)));
        info!(
            synced = progress.synced,
            source_gap,
            apply_gap,
            balance = %progress.balance,
            target = %progress.target,
            "waiting for funds"
        );
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// A report captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Balances {
        stage: ReportStage,
        lines: Vec<BalanceLine>,
    },
    Notice(String),
    FundsProgress(FundsProgress),
}

/// Keeps every report in arrival order.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<FundsProgress> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::FundsProgress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// The lines of the balance report for `stage`, if one was emitted.
    pub fn balances_at(&self, stage: ReportStage) -> Option<Vec<BalanceLine>> {
        self.events.lock().unwrap().iter().find_map(|e| match e {
            ReportEvent::Balances { stage: s, lines } if *s == stage => Some(lines.clone()),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn balances(&self, stage: ReportStage, lines: &[BalanceLine]) {
        self.events.lock().unwrap().push(ReportEvent::Balances {
            stage,
            lines: lines.to_vec(),
        });
    }

    fn notice(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ReportEvent::Notice(message.to_owned()));
    }

    fn funds_progress(&self, progress: &FundsProgress) {
        self.events
            .lock()
            .unwrap()
            .push(ReportEvent::FundsProgress(*progress));
    }
}
