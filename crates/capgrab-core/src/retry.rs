//! Cancellable sleeping and bounded polling
//!
//! Both the backoff between attempts and the readiness wait suspend here,
//! so a fired cancellation token ends either promptly.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Sleep for `duration` unless `cancel` fires first
pub async fn cancellable_sleep(
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Attempt count and spacing of a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for PollPolicy {
    /// 100 checks, 3 seconds apart
    fn default() -> Self {
        Self::new(100, Duration::from_secs(3))
    }
}

/// Run `step` up to `policy.max_attempts` times, sleeping `policy.interval`
/// between calls, until it breaks with a value.
///
/// Returns `Ok(None)` when every attempt continued.
pub async fn poll<T, F, Fut>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    mut step: F,
) -> Result<Option<T>, Cancelled>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ControlFlow<T>>,
{
    for attempt in 0..policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        if let ControlFlow::Break(value) = step(attempt).await {
            return Ok(Some(value));
        }

        // No sleep after the last attempt
        if attempt + 1 < policy.max_attempts {
            cancellable_sleep(cancel, policy.interval).await?;
        }
    }

    Ok(None)
}
