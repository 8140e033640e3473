//! State stream adapter.
//!
//! Backends publish [`WalletState`] snapshots through a [`StatePublisher`];
//! consumers read them through a [`StateStream`]. Both sides sit on a
//! `tokio::sync::watch` channel, which gives the semantics the waits need:
//!
//! - Publishing never blocks the producer, whatever the consumers do.
//! - Rapid updates coalesce: a consumer that falls behind sees the newest
//!   snapshot, never a backlog (latest-value-wins).
//! - Dropping a [`StateStream`] is the unsubscribe.
//!
//! Until the first snapshot is published the channel holds `None`; readers
//! wait for the first real snapshot instead of observing an empty state.

use sdk_core::WalletState;
use tokio::sync::watch;

use crate::SdkError;

// ---------------------------------------------------------------------------
// StatePublisher
// ---------------------------------------------------------------------------

/// Producer side of a wallet's state stream.
///
/// Dropping the publisher closes the stream; pending waits then fail with
/// [`SdkError::StreamClosed`].
pub struct StatePublisher {
    tx: watch::Sender<Option<WalletState>>,
}

impl StatePublisher {
    /// Creates a publisher with no snapshot yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publishes a snapshot, replacing the previous one.
    pub fn publish(&self, state: WalletState) {
        self.tx.send_replace(Some(state));
    }

    /// Opens a new subscription positioned at the current snapshot.
    pub fn subscribe(&self) -> StateStream {
        StateStream {
            rx: self.tx.subscribe(),
        }
    }

    /// The most recently published snapshot, if any.
    pub fn latest(&self) -> Option<WalletState> {
        self.tx.borrow().clone()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// StateStream
// ---------------------------------------------------------------------------

/// Consumer side of a wallet's state stream.
pub struct StateStream {
    rx: watch::Receiver<Option<WalletState>>,
}

impl StateStream {
    /// The first available snapshot: the current one, or the next one to be
    /// published if none exists yet.
    pub async fn current(self) -> Result<WalletState, SdkError> {
        self.first_matching(|_| true).await
    }

    /// Resolves exactly once with the first snapshot satisfying `pred`,
    /// starting with the current one, then drops the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::StreamClosed`] if the publisher goes away first.
    pub async fn first_matching<F>(mut self, mut pred: F) -> Result<WalletState, SdkError>
    where
        F: FnMut(&WalletState) -> bool,
    {
        let matched = self
            .rx
            .wait_for(|slot| slot.as_ref().is_some_and(&mut pred))
            .await
            .map_err(|_| SdkError::StreamClosed)?;
        matched.clone().ok_or(SdkError::StreamClosed)
    }

    /// Waits until a snapshot newer than the last one taken with
    /// [`StateStream::latest`] is available.
    pub async fn changed(&mut self) -> Result<(), SdkError> {
        self.rx.changed().await.map_err(|_| SdkError::StreamClosed)
    }

    /// Takes the newest snapshot and marks it seen.
    pub fn latest(&mut self) -> Option<WalletState> {
        self.rx.borrow_and_update().clone()
    }

    /// Forces the next [`StateStream::changed`] to return immediately, so
    /// the current snapshot is evaluated before waiting for a newer one.
    pub fn mark_changed(&mut self) {
        self.rx.mark_changed();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
