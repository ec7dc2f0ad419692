//! Dwell-time debouncing.
//!
//! A [`Debouncer`] holds at most one pending value together with the
//! deadline at which it becomes due. The owner drives it: it pushes values
//! as they arrive, sleeps until [`Debouncer::next_deadline`], and then calls
//! [`Debouncer::poll`]. No background task is involved, so the debouncer can
//! live inside an event loop that already owns the rest of the state.
//!
//! # Semantics
//!
//! 1. Pushing a value different from the pending one replaces it and
//!    restarts the window; the replaced value is never emitted.
//! 2. Pushing the value that is already pending keeps the original
//!    deadline, so the dwell is measured from the first push.
//! 3. Cancelling the pending value (e.g., the pointer left the element)
//!    discards it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use pulsetrail_tracker::utils::debounce::Debouncer;
//!
//! let start = Instant::now();
//! let mut debouncer = Debouncer::new(Duration::from_millis(100));
//!
//! debouncer.push("a", start);
//! debouncer.push("b", start + Duration::from_millis(50));
//!
//! assert!(debouncer.poll(start + Duration::from_millis(120)).is_none());
//! let due = debouncer.poll(start + Duration::from_millis(150)).unwrap();
//! assert_eq!(due.value, "b");
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// A value waiting for its dwell time to elapse.
#[derive(Debug, Clone)]
struct PendingEvent<T> {
    /// The value to emit when the deadline passes.
    value: T,
    /// When the value was first pushed.
    since: Instant,
    /// When this value becomes due.
    deadline: Instant,
}

/// A value whose dwell time has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounced<T> {
    pub value: T,
    /// Time between the first push and the poll that released it.
    pub dwell: Duration,
}

/// Single-slot debouncer keyed by value equality.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<PendingEvent<T>>,
}

impl<T: PartialEq> Debouncer<T> {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Starts or continues the dwell window for `value`.
    ///
    /// Returns `true` if a different pending value was discarded.
    pub fn push(&mut self, value: T, now: Instant) -> bool {
        if let Some(pending) = &self.pending {
            if pending.value == value {
                trace!("Value already pending, keeping deadline");
                return false;
            }
        }

        let discarded = self.pending.is_some();
        self.pending = Some(PendingEvent {
            value,
            since: now,
            deadline: now + self.interval,
        });
        discarded
    }

    /// Discards the pending value if it equals `value`.
    pub fn cancel(&mut self, value: &T) -> bool {
        match &self.pending {
            Some(pending) if pending.value == *value => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Discards any pending value.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Releases the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Debounced<T>> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        let pending = self.pending.take()?;
        Some(Debounced {
            value: pending.value,
            dwell: now.saturating_duration_since(pending.since),
        })
    }
}
