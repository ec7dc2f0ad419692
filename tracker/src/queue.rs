//! In-memory FIFO buffer for batched events.
//!
//! The queue is one half of a double-threshold flush policy: reaching
//! `batch_size` detaches the buffered events immediately, while the owner's
//! periodic timer calls [`EventQueue::take`] to bound staleness. Either way
//! the buffer is swapped for an empty one before anything is sent, so events
//! captured while a request is in flight go to the next batch.
//!
//! ```
//! use pulsetrail_tracker::queue::EventQueue;
//! use pulsetrail_tracker::types::{Event, EventType};
//!
//! let mut queue = EventQueue::new(2);
//! let event = || Event::new(EventType::Click, Default::default());
//!
//! assert!(queue.enqueue(event()).is_none());
//! let batch = queue.enqueue(event()).expect("threshold reached");
//! assert_eq!(batch.len(), 2);
//! assert!(queue.is_empty());
//! ```

use tracing::trace;

use crate::types::Event;

/// Ordered buffer of events awaiting delivery. Not hard-capped.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<Event>,
    batch_size: usize,
}

impl EventQueue {
    /// Creates an empty queue that detaches a batch every `batch_size` events.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            events: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Appends an event.
    ///
    /// Returns the detached batch when this event brings the queue to
    /// `batch_size`, leaving the queue empty before the next event arrives.
    pub fn enqueue(&mut self, event: Event) -> Option<Vec<Event>> {
        self.events.push(event);
        trace!(len = self.events.len(), batch_size = self.batch_size, "Event queued");

        if self.events.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Detaches and returns every buffered event.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::replace(&mut self.events, Vec::with_capacity(self.batch_size))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
