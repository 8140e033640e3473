//! SDK operations: readiness waits, balance queries, and transfers.
//!
//! Each submodule adds one family of methods to [`crate::Sdk`]. All of them
//! follow the same pattern:
//!
//! 1. Check the cancellation token
//! 2. Subscribe to the handle's state stream
//! 3. Resolve once, racing the configured timeout and cancellation

pub mod balance;
pub mod funds;
pub mod sync;
pub mod tracking;
pub mod transfer;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::SdkError;

/// Runs `fut` to completion unless `cancel` fires or `timeout` elapses
/// first. Dropping the losing future releases its subscription.
pub(crate) async fn guarded<T, F>(
    cancel: &CancellationToken,
    timeout: Option<Duration>,
    on_timeout: SdkError,
    fut: F,
) -> Result<T, SdkError>
where
    F: Future<Output = Result<T, SdkError>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| on_timeout)?,
            None => fut.await,
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(SdkError::Cancelled),
        result = bounded => result,
    }
}
