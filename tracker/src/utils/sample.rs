//! Rate limiting for high-frequency signal streams.

use std::time::Duration;

use tokio::time::Instant;

/// Admits at most one signal per interval.
///
/// The first signal is always admitted; afterwards a signal is admitted
/// only once `interval` has passed since the last admitted one.
#[derive(Debug, Clone)]
pub struct Sampler {
    interval: Duration,
    last: Option<Instant>,
}

impl Sampler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` if the signal at `now` should be kept.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
