//! The tracker instance and its event loop.
//!
//! [`Tracker::start`] spawns one task that owns every piece of mutable
//! state: the event queue, the idle monitor, the capture state and the
//! timers. The returned [`Tracker`] is a handle that forwards signals into a
//! bounded channel without blocking; when the channel is full the signal is
//! dropped.
//!
//! Each loop turn handles exactly one of:
//!
//! - a signal from the handle
//! - the pending hover becoming due
//! - the idle deadline passing
//! - the periodic flush tick
//!
//! An `Unload` signal, [`Tracker::shutdown`], or dropping every handle runs
//! teardown: the residual queue and the session-end payload are sent
//! concurrently, each bounded by `teardown_timeout`, and the loop exits.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::capture::{Capture, EventCapture, Subscription};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::idle::{IdleMonitor, IdleTransition};
use crate::input::{
    Download, Filter, FormSubmit, InteractionEvent, Modal, PageView, Search, Section, TabSwitch,
    Visibility,
};
use crate::queue::EventQueue;
use crate::sender::{Dispatcher, Endpoint, Transport};
use crate::types::{BatchPayload, Event, SessionEventKind, SessionPayload};

/// Messages from the handle to the event loop.
#[derive(Debug)]
enum Signal {
    Event(InteractionEvent),
    Flush,
    ResetIdle,
    Buffered(oneshot::Sender<usize>),
}

/// Handle to a running tracker.
///
/// Every method that forwards a signal returns `true` if the signal was
/// accepted and `false` if it was dropped (channel full or tracker stopped).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pulsetrail_tracker::config::TrackerConfig;
/// use pulsetrail_tracker::dom::Element;
/// use pulsetrail_tracker::input::{InteractionEvent, PointerInput};
/// use pulsetrail_tracker::sender::MemoryTransport;
/// use pulsetrail_tracker::tracker::Tracker;
///
/// #[tokio::main]
/// async fn main() -> pulsetrail_tracker::Result<()> {
///     let config = TrackerConfig::new("https://app.example.com/api/events");
///     let tracker = Tracker::start(config, Arc::new(MemoryTransport::new()))?;
///
///     let save = Element::new("button").with_id("save").with_text("Save");
///     tracker.dispatch(InteractionEvent::Click(PointerInput::new(save, 10, 20)));
///
///     tracker.shutdown().await
/// }
/// ```
#[derive(Debug)]
pub struct Tracker {
    tx: mpsc::Sender<Signal>,
    task: JoinHandle<()>,
    session_id: Uuid,
}

impl Tracker {
    /// Validates `config` and spawns the event loop.
    ///
    /// Emits the session `start` event. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Config` if the configuration is invalid.
    pub fn start(config: TrackerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let event_loop = EventLoop::new(&config, Dispatcher::new(transport));
        let session_id = event_loop.idle.session().session_id;

        info!(
            endpoint = %config.endpoint,
            source_id = %config.source_id,
            %session_id,
            "Tracker started"
        );

        let task = tokio::spawn(event_loop.run(rx));
        Ok(Self {
            tx,
            task,
            session_id,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Forwards a host signal without blocking.
    pub fn dispatch(&self, event: InteractionEvent) -> bool {
        self.signal(Signal::Event(event))
    }

    /// Forwards a host signal, waiting for channel space.
    ///
    /// For feeders that must not lose input, such as replay. Returns `false`
    /// only once the tracker has stopped.
    pub async fn dispatch_wait(&self, event: InteractionEvent) -> bool {
        self.tx.send(Signal::Event(event)).await.is_ok()
    }

    pub fn track_page_view(&self, view: PageView) -> bool {
        self.dispatch(InteractionEvent::PageView(view))
    }

    pub fn track_tab_switch(&self, switch: TabSwitch) -> bool {
        self.dispatch(InteractionEvent::TabSwitch(switch))
    }

    pub fn track_modal_open(&self, modal: impl Into<String>) -> bool {
        self.dispatch(InteractionEvent::ModalOpen(Modal { modal: modal.into() }))
    }

    pub fn track_modal_close(&self, modal: impl Into<String>) -> bool {
        self.dispatch(InteractionEvent::ModalClose(Modal { modal: modal.into() }))
    }

    pub fn track_form_submit(&self, form: FormSubmit) -> bool {
        self.dispatch(InteractionEvent::FormSubmit(form))
    }

    pub fn track_search(&self, search: Search) -> bool {
        self.dispatch(InteractionEvent::Search(search))
    }

    pub fn track_filter(&self, field: impl Into<String>, value: impl Into<String>) -> bool {
        self.dispatch(InteractionEvent::Filter(Filter {
            field: field.into(),
            value: value.into(),
        }))
    }

    pub fn track_expand(&self, section: impl Into<String>) -> bool {
        self.dispatch(InteractionEvent::Expand(Section {
            section: section.into(),
        }))
    }

    pub fn track_collapse(&self, section: impl Into<String>) -> bool {
        self.dispatch(InteractionEvent::Collapse(Section {
            section: section.into(),
        }))
    }

    pub fn track_download(&self, download: Download) -> bool {
        self.dispatch(InteractionEvent::Download(download))
    }

    /// Flushes the queue now, independent of size and timer.
    pub fn flush(&self) -> bool {
        self.signal(Signal::Flush)
    }

    /// Counts as activity for idle tracking.
    pub fn reset_idle_timer(&self) -> bool {
        self.signal(Signal::ResetIdle)
    }

    /// Number of events waiting in the queue, or `None` if the tracker has
    /// stopped or the request was dropped.
    pub async fn buffered(&self) -> Option<usize> {
        let (reply, rx) = oneshot::channel();
        if !self.signal(Signal::Buffered(reply)) {
            return None;
        }
        rx.await.ok()
    }

    /// Runs teardown and waits for the event loop to exit.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Stopped` if the event loop panicked.
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means teardown already ran.
        let _ = self.tx.send(Signal::Event(InteractionEvent::Unload)).await;
        drop(self.tx);
        self.task.await.map_err(|e| {
            debug!(error = %e, "Event loop did not exit cleanly");
            TrackerError::Stopped
        })
    }

    fn signal(&self, signal: Signal) -> bool {
        match self.tx.try_send(signal) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("Signal channel full, dropping signal");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// State owned by the event-loop task.
struct EventLoop {
    capture: EventCapture,
    queue: EventQueue,
    idle: IdleMonitor,
    dispatcher: Dispatcher,
    flush_interval: Duration,
    teardown_timeout: Duration,
}

impl EventLoop {
    fn new(config: &TrackerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            capture: EventCapture::new(config),
            queue: EventQueue::new(config.batch_size),
            idle: IdleMonitor::new(config.idle_threshold, Instant::now()),
            dispatcher,
            flush_interval: config.flush_interval,
            teardown_timeout: config.teardown_timeout,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Signal>) {
        self.send_session(SessionPayload::new(SessionEventKind::Start, self.session_id()));

        let mut flush_timer =
            interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let hover_deadline = self.capture.hover_deadline();
            let idle_deadline = self.idle.deadline();

            tokio::select! {
                biased;

                signal = rx.recv() => match signal {
                    Some(Signal::Event(InteractionEvent::Unload)) => {
                        debug!("Unload received");
                        break;
                    }
                    Some(signal) => self.on_signal(signal),
                    None => {
                        debug!("All tracker handles dropped");
                        break;
                    }
                },

                () = sleep_until_opt(hover_deadline) => {
                    let now = Instant::now();
                    match self.capture.poll_hover(now) {
                        Ok(Some(capture)) => self.route(capture),
                        Ok(None) => {}
                        Err(e) => debug!(error = %e, "Failed to build hover event"),
                    }
                }

                () = sleep_until_opt(idle_deadline) => self.poll_idle(Instant::now()),

                _ = flush_timer.tick() => self.flush("timer"),
            }
        }

        self.teardown().await;
    }

    fn session_id(&self) -> Uuid {
        self.idle.session().session_id
    }

    fn on_signal(&mut self, signal: Signal) {
        let now = Instant::now();
        match signal {
            Signal::Event(event) => self.on_event(event, now),
            Signal::Flush => self.flush("explicit"),
            Signal::ResetIdle => self.record_activity(now),
            Signal::Buffered(reply) => {
                let _ = reply.send(self.queue.len());
            }
        }
    }

    fn on_event(&mut self, event: InteractionEvent, now: Instant) {
        if event.activity().is_some() {
            self.record_activity(now);
        }

        if let InteractionEvent::Visibility { state } = event {
            if self.capture.subscribes(Subscription::Visibility) {
                self.on_visibility(state, now);
            }
            return;
        }

        match self.capture.handle(event, now) {
            Ok(Some(capture)) => self.route(capture),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Failed to capture event"),
        }
    }

    fn on_visibility(&mut self, state: Visibility, now: Instant) {
        let kind = match state {
            Visibility::Hidden => SessionEventKind::VisibilityHidden,
            Visibility::Visible => SessionEventKind::VisibilityVisible,
        };
        self.send_session(SessionPayload::new(kind, self.session_id()));

        if state == Visibility::Visible {
            self.record_activity(now);
        }
    }

    /// Emits `idle` if the deadline has passed, then `resume` if the session
    /// was idle.
    fn record_activity(&mut self, now: Instant) {
        self.poll_idle(now);

        if let Some(IdleTransition::Resumed { idle_for }) = self.idle.record_activity(now) {
            let mut payload = SessionPayload::new(SessionEventKind::Resume, self.session_id());
            payload.idle_duration_seconds = Some(idle_for.as_secs());
            self.send_session(payload);
        }
    }

    fn poll_idle(&mut self, now: Instant) {
        if let Some(IdleTransition::BecameIdle { idle_secs }) = self.idle.poll(now) {
            let mut payload = SessionPayload::new(SessionEventKind::Idle, self.session_id());
            payload.idle_time = Some(idle_secs);
            self.send_session(payload);
        }
    }

    fn route(&mut self, capture: Capture) {
        match capture {
            Capture::Queued(event) => {
                if let Some(batch) = self.queue.enqueue(event) {
                    self.send_batch(batch, "size");
                }
            }
            Capture::Immediate { endpoint, body } => {
                self.dispatcher.send_and_forget(endpoint, body);
            }
        }
    }

    fn flush(&mut self, reason: &'static str) {
        if self.queue.is_empty() {
            return;
        }
        let batch = self.queue.take();
        self.send_batch(batch, reason);
    }

    fn send_batch(&self, events: Vec<Event>, reason: &'static str) {
        debug!(events = events.len(), reason, "Flushing batch");
        if let Some(body) = to_body(&BatchPayload { events }) {
            self.dispatcher.send_and_forget(Endpoint::Batch, body);
        }
    }

    fn send_session(&self, payload: SessionPayload) {
        trace!(event = ?payload.event, "Session event");
        if let Some(body) = to_body(&payload) {
            self.dispatcher.send_and_forget(Endpoint::Session, body);
        }
    }

    async fn teardown(mut self) {
        let now = Instant::now();
        let residual = self.queue.take();
        let residual_len = residual.len();

        let mut end = SessionPayload::new(SessionEventKind::End, self.session_id());
        end.duration_seconds = Some(self.idle.duration_secs(now));

        info!(
            residual_events = residual_len,
            duration_seconds = ?end.duration_seconds,
            "Tracker shutting down"
        );

        let flush = async {
            if residual_len == 0 {
                return true;
            }
            match to_body(&BatchPayload { events: residual }) {
                Some(body) => {
                    self.dispatcher
                        .send_bounded(Endpoint::Batch, body, self.teardown_timeout)
                        .await
                }
                None => false,
            }
        };
        let beacon = async {
            match to_body(&end) {
                Some(body) => {
                    self.dispatcher
                        .beacon(Endpoint::Session, body, self.teardown_timeout)
                        .await
                }
                None => false,
            }
        };

        let (flushed, ended) = tokio::join!(flush, beacon);
        info!(flushed, ended, "Tracker stopped");
    }
}

fn to_body<T: Serialize>(payload: &T) -> Option<serde_json::Value> {
    serde_json::to_value(payload)
        .map_err(|e| debug!(error = %e, "Failed to serialize payload"))
        .ok()
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::MemoryTransport;
    use serde_json::json;

    fn config() -> TrackerConfig {
        TrackerConfig::new("https://app.example.com/api/events")
    }

    #[tokio::test]
    async fn start_rejects_invalid_config() {
        let mut cfg = config();
        cfg.batch_size = 0;

        let err = Tracker::start(cfg, Arc::new(MemoryTransport::new())).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn start_emits_session_start() {
        let transport = MemoryTransport::new();
        let tracker = Tracker::start(config(), Arc::new(transport.clone())).unwrap();
        tracker.buffered().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let sessions = transport.requests_to(Endpoint::Session);
        assert_eq!(sessions[0]["event"], json!("start"));
        assert_eq!(sessions[0]["session_id"], json!(tracker.session_id().to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_after_unload_is_rejected() {
        let transport = MemoryTransport::new();
        let tracker = Tracker::start(config(), Arc::new(transport.clone())).unwrap();

        assert!(tracker.dispatch(InteractionEvent::Unload));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!tracker.track_modal_open("Settings"));
        assert_eq!(tracker.buffered().await, None);
        assert!(tracker.shutdown().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn full_channel_drops_signals() {
        let mut cfg = config();
        cfg.channel_capacity = 1;
        let tracker = Tracker::start(cfg, Arc::new(MemoryTransport::new())).unwrap();

        // The loop has not run yet, so the single slot fills up.
        assert!(tracker.flush());
        assert!(!tracker.flush());
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_wait_waits_for_space() {
        let mut cfg = config();
        cfg.channel_capacity = 1;
        let tracker = Tracker::start(cfg, Arc::new(MemoryTransport::new())).unwrap();

        for n in 0..5 {
            let modal = Modal {
                modal: format!("Step {n}"),
            };
            assert!(tracker.dispatch_wait(InteractionEvent::ModalOpen(modal)).await);
        }
        assert_eq!(tracker.buffered().await, Some(5));

        assert!(tracker.dispatch_wait(InteractionEvent::Unload).await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!tracker.dispatch_wait(InteractionEvent::Unload).await);
    }
}
