//! Jittered delay between attempts

use crate::retry::{Cancelled, cancellable_sleep};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Picks the delay for a `[min, max]` window
pub trait DelaySource: Send + Sync {
    fn pick(&self, min: Duration, max: Duration) -> Duration;
}

/// Uniform whole seconds in `[min, max)`.
///
/// A non-positive bound means 1 second; `min >= max` means `max`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDelay;

impl DelaySource for RandomDelay {
    fn pick(&self, min: Duration, max: Duration) -> Duration {
        let (min, max) = (min.as_secs(), max.as_secs());
        if min == 0 || max == 0 {
            return Duration::from_secs(1);
        }
        if min >= max {
            return Duration::from_secs(max);
        }
        Duration::from_secs(rand::thread_rng().gen_range(min..max))
    }
}

/// Always the same delay, regardless of the window
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn pick(&self, _min: Duration, _max: Duration) -> Duration {
        self.0
    }
}

/// Delay window of one run
#[derive(Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    source: Arc<dyn DelaySource>,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration, source: Arc<dyn DelaySource>) -> Self {
        Self { min, max, source }
    }

    pub fn next_delay(&self) -> Duration {
        self.source.pick(self.min, self.max)
    }

    /// Sleep for the next delay; returns how long it slept
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<Duration, Cancelled> {
        let delay = self.next_delay();
        tracing::debug!("Sleeping {}s before the next attempt", delay.as_secs());
        cancellable_sleep(cancel, delay).await?;
        Ok(delay)
    }
}
