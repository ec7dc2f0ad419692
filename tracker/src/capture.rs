//! Turns host signals into structured events.
//!
//! [`EventCapture`] owns the subscription list and the per-source state
//! (current page, pending hover, pointer sampler). For each signal it
//! builds an event with the path resolver and the description generator,
//! and says where the event goes: into the batch queue, or straight to an
//! ingestion route.
//!
//! Session signals (activity, visibility, unload) carry no event of their
//! own here; the tracker's event loop handles them together with the idle
//! monitor.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::trace;

use crate::config::TrackerConfig;
use crate::describe::{self, ClickAction};
use crate::dom::Element;
use crate::error::Result;
use crate::input::{
    ErrorReport, InteractionEvent, MoveInput, PageView, PointerInput, Rejection, Search,
};
use crate::interactive::{classify, find_interactive, is_hover_worthy, is_interactive};
use crate::path::resolve_path;
use crate::privacy::{self, class_string, custom_attributes, text_snippet, truncate};
use crate::sender::Endpoint;
use crate::types::{
    ClickEventData, ErrorPayload, Event, EventType, HoverEventData, InteractiveElement,
    MouseMoveEventData, PageViewPayload, PointerEventData, SemanticEventData,
};
use crate::utils::{Debouncer, Sampler};

/// Signal sources the capture layer listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Click,
    RightClick,
    DoubleClick,
    Hover,
    MouseMove,
    Visibility,
    Unload,
    Error,
    UnhandledRejection,
}

impl Subscription {
    /// Builds the subscription list for `config`.
    #[must_use]
    pub fn from_config(config: &TrackerConfig) -> Vec<Self> {
        let mut subs = vec![
            Self::Click,
            Self::Visibility,
            Self::Unload,
            Self::Error,
            Self::UnhandledRejection,
        ];
        if config.track_right_clicks {
            subs.push(Self::RightClick);
        }
        if config.track_double_clicks {
            subs.push(Self::DoubleClick);
        }
        if config.track_hover {
            subs.push(Self::Hover);
        }
        if config.track_mouse_path {
            subs.push(Self::MouseMove);
        }
        subs
    }

    /// The subscription a signal belongs to, if it needs one.
    #[must_use]
    pub fn of(event: &InteractionEvent) -> Option<Self> {
        match event {
            InteractionEvent::Click(_) => Some(Self::Click),
            InteractionEvent::RightClick(_) => Some(Self::RightClick),
            InteractionEvent::DoubleClick(_) => Some(Self::DoubleClick),
            InteractionEvent::MouseOver { .. } | InteractionEvent::MouseOut { .. } => {
                Some(Self::Hover)
            }
            InteractionEvent::MouseMove(_) => Some(Self::MouseMove),
            InteractionEvent::Visibility { .. } => Some(Self::Visibility),
            InteractionEvent::Unload => Some(Self::Unload),
            InteractionEvent::Error(_) => Some(Self::Error),
            InteractionEvent::UnhandledRejection(_) => Some(Self::UnhandledRejection),
            _ => None,
        }
    }
}

/// Where a captured event goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// Append to the batch queue.
    Queued(Event),
    /// Send on its own, bypassing the queue.
    Immediate { endpoint: Endpoint, body: Value },
}

impl Capture {
    fn immediate<T: Serialize>(endpoint: Endpoint, payload: &T) -> Result<Self> {
        Ok(Self::Immediate {
            endpoint,
            body: serde_json::to_value(payload)?,
        })
    }
}

/// Builds events from host signals.
#[derive(Debug)]
pub struct EventCapture {
    subscriptions: Vec<Subscription>,
    origin: Option<Url>,
    current_page: String,
    track_all_clicks: bool,
    hover: Debouncer<Element>,
    mouse: Sampler,
}

impl EventCapture {
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            subscriptions: Subscription::from_config(config),
            origin: config.origin.clone(),
            current_page: config.initial_page.clone(),
            track_all_clicks: config.track_all_clicks,
            hover: Debouncer::new(config.hover_debounce),
            mouse: Sampler::new(config.mouse_path_sample_rate),
        }
    }

    #[must_use]
    pub fn subscribes(&self, sub: Subscription) -> bool {
        self.subscriptions.contains(&sub)
    }

    #[must_use]
    pub fn current_page(&self) -> &str {
        &self.current_page
    }

    /// Builds the event for `signal`, if it produces one.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Json` if a payload cannot be serialized.
    pub fn handle(&mut self, signal: InteractionEvent, now: Instant) -> Result<Option<Capture>> {
        if let Some(sub) = Subscription::of(&signal) {
            if !self.subscribes(sub) {
                trace!(?sub, "Signal source not subscribed");
                return Ok(None);
            }
        }

        let capture = match signal {
            InteractionEvent::Click(input) => self.click(&input)?,
            InteractionEvent::RightClick(input) => {
                Some(self.pointer(&input, ClickAction::RightClick, EventType::RightClick)?)
            }
            InteractionEvent::DoubleClick(input) => {
                Some(self.pointer(&input, ClickAction::DoubleClick, EventType::DoubleClick)?)
            }
            InteractionEvent::MouseOver { target } => {
                self.hover_over(target, now);
                None
            }
            InteractionEvent::MouseOut { target } => {
                if let Some(el) = target.closest(|el| is_hover_worthy(el)) {
                    self.hover.cancel(el);
                }
                None
            }
            InteractionEvent::MouseMove(input) => self.mouse_move(&input, now)?,
            InteractionEvent::PageView(view) => Some(self.page_view(view)?),
            InteractionEvent::TabSwitch(switch) => {
                let description = describe::describe_tab_switch(&switch);
                Some(self.semantic(EventType::TabSwitch, switch, description)?)
            }
            InteractionEvent::ModalOpen(modal) => {
                let description = describe::describe_modal(&modal, true);
                Some(self.semantic(EventType::ModalOpen, modal, description)?)
            }
            InteractionEvent::ModalClose(modal) => {
                let description = describe::describe_modal(&modal, false);
                Some(self.semantic(EventType::ModalClose, modal, description)?)
            }
            InteractionEvent::FormSubmit(form) => {
                let description = describe::describe_form_submit(&form);
                Some(self.semantic(EventType::FormSubmit, form, description)?)
            }
            InteractionEvent::Search(search) => {
                let search = Search {
                    query: truncate(&search.query, privacy::MAX_QUERY_LEN),
                    ..search
                };
                let description = describe::describe_search(&search);
                Some(self.semantic(EventType::Search, search, description)?)
            }
            InteractionEvent::Filter(filter) => {
                let description = describe::describe_filter(&filter);
                Some(self.semantic(EventType::Filter, filter, description)?)
            }
            InteractionEvent::Expand(section) => {
                let description = describe::describe_section(&section, true);
                Some(self.semantic(EventType::Expand, section, description)?)
            }
            InteractionEvent::Collapse(section) => {
                let description = describe::describe_section(&section, false);
                Some(self.semantic(EventType::Collapse, section, description)?)
            }
            InteractionEvent::Download(download) => {
                let description = describe::describe_download(&download);
                Some(self.semantic(EventType::Download, download, description)?)
            }
            InteractionEvent::Error(report) => Some(self.error(report)?),
            InteractionEvent::UnhandledRejection(rejection) => Some(self.rejection(rejection)?),
            // Session signals are owned by the event loop.
            InteractionEvent::Activity { .. }
            | InteractionEvent::Visibility { .. }
            | InteractionEvent::Unload => None,
        };
        Ok(capture)
    }

    /// When the pending hover becomes due, if one is pending.
    #[must_use]
    pub fn hover_deadline(&self) -> Option<Instant> {
        self.hover.next_deadline()
    }

    /// Emits the pending hover if it has dwelled long enough.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Json` if the payload cannot be serialized.
    pub fn poll_hover(&mut self, now: Instant) -> Result<Option<Capture>> {
        let Some(due) = self.hover.poll(now) else {
            return Ok(None);
        };
        Ok(Some(self.hover_event(&due.value, due.dwell)?))
    }

    fn click(&self, input: &PointerInput) -> Result<Option<Capture>> {
        let data = self.click_data(input, ClickAction::Click);
        if !data.is_interactive && !self.track_all_clicks {
            trace!(tag = %data.element_type, "Ignoring non-interactive click");
            return Ok(None);
        }
        Ok(Some(Capture::Queued(Event::from_payload(EventType::Click, &data)?)))
    }

    fn pointer(
        &self,
        input: &PointerInput,
        action: ClickAction,
        event_type: EventType,
    ) -> Result<Capture> {
        let data = PointerEventData::from(self.click_data(input, action));
        Ok(Capture::Queued(Event::from_payload(event_type, &data)?))
    }

    fn click_data(&self, input: &PointerInput, action: ClickAction) -> ClickEventData {
        let target = &input.target;
        let interactive = find_interactive(target).map(interactive_descriptor);
        let (page_x, page_y) = input.page_position();

        let mut data = ClickEventData {
            element_type: target.tag.clone(),
            element_id: target.id().map(str::to_string),
            element_text: text_snippet(target.text.as_deref()),
            element_class: class_string(target),
            x: input.x,
            y: input.y,
            page_x,
            page_y,
            modifiers: input.modifiers,
            button: input.button,
            path: resolve_path(target),
            is_interactive: interactive.is_some(),
            interactive,
            attributes: custom_attributes(target),
            page: self.current_page.clone(),
            action_description: String::new(),
        };
        data.action_description = describe::describe_click(&data, action, self.origin.as_ref());
        data
    }

    fn hover_over(&mut self, target: Element, now: Instant) {
        match target.closest(|el| is_hover_worthy(el)) {
            Some(el) => {
                if self.hover.push(el.clone(), now) {
                    trace!("Pending hover replaced");
                }
            }
            None => self.hover.clear(),
        }
    }

    fn hover_event(&self, el: &Element, dwell: Duration) -> Result<Capture> {
        let text = text_snippet(el.text.as_deref());
        let kind = is_interactive(el).then(|| classify(el));
        let data = HoverEventData {
            element_type: el.tag.clone(),
            element_id: el.id().map(str::to_string),
            action_description: describe::describe_hover(&el.tag, text.as_deref(), kind),
            element_text: text,
            path: resolve_path(el),
            interactive_kind: kind,
            dwell_ms: u64::try_from(dwell.as_millis()).unwrap_or(u64::MAX),
            page: self.current_page.clone(),
        };
        Ok(Capture::Queued(Event::from_payload(EventType::Hover, &data)?))
    }

    fn mouse_move(&mut self, input: &MoveInput, now: Instant) -> Result<Option<Capture>> {
        if !self.mouse.admit(now) {
            return Ok(None);
        }
        let data = MouseMoveEventData {
            x: input.x,
            y: input.y,
            page_x: input.page_x.unwrap_or(input.x),
            page_y: input.page_y.unwrap_or(input.y),
            path: input.target.as_ref().map(resolve_path),
            page: self.current_page.clone(),
            action_description: describe::describe_mouse_move(input.x, input.y),
        };
        Ok(Some(Capture::Queued(Event::from_payload(EventType::MouseMove, &data)?)))
    }

    fn page_view(&mut self, view: PageView) -> Result<Capture> {
        let action_description = describe::describe_page_view(&view);
        self.current_page.clone_from(&view.page);
        let payload = PageViewPayload {
            page: view.page,
            profile_name: view.profile_name,
            referrer: view.referrer,
            timestamp: chrono::Utc::now(),
            action_description,
        };
        Capture::immediate(Endpoint::PageView, &payload)
    }

    fn semantic<T: Serialize>(
        &self,
        event_type: EventType,
        details: T,
        action_description: String,
    ) -> Result<Capture> {
        let data = SemanticEventData {
            details,
            page: self.current_page.clone(),
            action_description,
        };
        Ok(Capture::Queued(Event::from_payload(event_type, &data)?))
    }

    fn error(&self, report: ErrorReport) -> Result<Capture> {
        let payload = ErrorPayload {
            message: report.message,
            source: report.source,
            line: report.line,
            column: report.column,
            stack: report.stack.map(|s| truncate(&s, privacy::MAX_STACK_LEN)),
            page: self.current_page.clone(),
            timestamp: chrono::Utc::now(),
        };
        Capture::immediate(Endpoint::Error, &payload)
    }

    fn rejection(&self, rejection: Rejection) -> Result<Capture> {
        self.error(ErrorReport {
            message: format!("Unhandled promise rejection: {}", rejection.reason),
            source: None,
            line: None,
            column: None,
            stack: rejection.stack,
        })
    }
}

fn interactive_descriptor(el: &Element) -> InteractiveElement {
    let text = text_snippet(el.text.as_deref())
        .or_else(|| text_snippet(el.attr("aria-label")))
        .or_else(|| text_snippet(el.attr("title")));
    let input_type = (el.tag == "input").then(|| el.attr("type").unwrap_or("text").to_string());

    InteractiveElement {
        kind: classify(el),
        id: el.id().map(str::to_string),
        text,
        target_url: el.attr("href").map(str::to_string),
        action: el.attr("data-action").map(str::to_string),
        input_type,
        name: el.attr("name").map(str::to_string),
    }
}
