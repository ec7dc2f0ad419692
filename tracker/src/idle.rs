//! Active/Idle session state.
//!
//! The monitor models the inactivity timer as a restartable single-shot
//! deadline: every qualifying activity signal pushes the deadline out to
//! `last_activity + threshold`. When the owner observes the deadline pass it
//! calls [`IdleMonitor::poll`], which flips the session to Idle exactly once.
//! The next activity flips it back and reports a [`IdleTransition::Resumed`]
//! that the caller must emit before processing the signal any further.
//!
//! ```text
//!            activity (restart deadline)
//!              ┌─────┐
//!              ▼     │
//!          ┌────────┐   deadline passes   ┌──────┐
//!  start ─►│ Active │ ──────────────────► │ Idle │
//!          └────────┘ ◄────────────────── └──────┘
//!                      activity (resume)
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Per-instance session bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub session_start: Instant,
    pub started_at: DateTime<Utc>,
    pub last_activity: Instant,
    pub is_idle: bool,
}

/// A change of session state that must be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTransition {
    /// The threshold elapsed without activity.
    BecameIdle {
        /// The threshold, in whole seconds.
        idle_secs: u64,
    },
    /// Activity arrived while idle.
    Resumed {
        /// Time since the last activity before this one.
        idle_for: Duration,
    },
}

/// Tracks whether the user is active or idle.
#[derive(Debug, Clone)]
pub struct IdleMonitor {
    threshold: Duration,
    state: SessionState,
}

impl IdleMonitor {
    /// Starts a new session in the Active state.
    #[must_use]
    pub fn new(threshold: Duration, now: Instant) -> Self {
        Self {
            threshold,
            state: SessionState {
                session_id: Uuid::new_v4(),
                session_start: now,
                started_at: Utc::now(),
                last_activity: now,
                is_idle: false,
            },
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.is_idle
    }

    /// When the session goes idle absent further activity; `None` while idle.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        (!self.state.is_idle).then(|| self.state.last_activity + self.threshold)
    }

    /// Records a qualifying activity signal and restarts the timer.
    pub fn record_activity(&mut self, now: Instant) -> Option<IdleTransition> {
        let previous = self.state.last_activity;
        self.state.last_activity = now;

        if self.state.is_idle {
            self.state.is_idle = false;
            let idle_for = now.saturating_duration_since(previous);
            debug!(idle_secs = idle_for.as_secs(), "Session resumed");
            Some(IdleTransition::Resumed { idle_for })
        } else {
            None
        }
    }

    /// Flips to Idle if the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<IdleTransition> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        self.state.is_idle = true;
        let idle_secs = self.threshold.as_secs();
        debug!(idle_secs, "Session idle");
        Some(IdleTransition::BecameIdle { idle_secs })
    }

    /// Session length so far, in whole seconds.
    #[must_use]
    pub fn duration_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.state.session_start).as_secs()
    }
}
