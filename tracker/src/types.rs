//! Outgoing event schema.
//!
//! Queued interactions are serialized as [`Event`] records and delivered in
//! a [`BatchPayload`]. Lifecycle, page-view and error records bypass the
//! queue and have their own payload types. All keys are snake_case, matching
//! what the ingestion service reads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::input::Modifiers;
use crate::interactive::ElementKind;

/// Closed set of queued event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Click,
    #[serde(rename = "rightclick")]
    RightClick,
    #[serde(rename = "dblclick")]
    DoubleClick,
    Hover,
    #[serde(rename = "mousemove")]
    MouseMove,
    TabSwitch,
    ModalOpen,
    ModalClose,
    FormSubmit,
    Search,
    Filter,
    Expand,
    Collapse,
    Download,
    Error,
    Session,
}

/// A structured interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Classification of the event.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Event-specific fields.
    pub data: Map<String, Value>,

    /// When the interaction was captured.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, data: Map<String, Value>) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Creates an event whose data is the serialized form of `payload`.
    ///
    /// A payload that does not serialize to a JSON object is stored under
    /// the `value` key.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if `payload` cannot be serialized.
    pub fn from_payload<T: Serialize>(
        event_type: EventType,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let data = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Ok(Self::new(event_type, data))
    }

    /// Returns the generated description, if the event carries one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.data.get("action_description").and_then(Value::as_str)
    }
}

/// Body of a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub events: Vec<Event>,
}

/// Sub-descriptor of the interactive element a click was attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Link destination or tab target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// Declared `data-action` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// `name`, `placeholder` or `aria-label` of a form control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Data of a `click` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEventData {
    /// Tag of the element that received the click.
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_class: Option<String>,
    pub x: i32,
    pub y: i32,
    pub page_x: i32,
    pub page_y: i32,
    #[serde(flatten)]
    pub modifiers: Modifiers,
    pub button: i16,
    pub path: String,
    pub is_interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<InteractiveElement>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub page: String,
    pub action_description: String,
}

/// Data of `rightclick` and `dblclick` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEventData {
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    pub x: i32,
    pub y: i32,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive_kind: Option<ElementKind>,
    pub page: String,
    pub action_description: String,
}

impl From<ClickEventData> for PointerEventData {
    fn from(click: ClickEventData) -> Self {
        Self {
            element_type: click.element_type,
            element_id: click.element_id,
            element_text: click.element_text,
            x: click.x,
            y: click.y,
            path: click.path,
            interactive_kind: click.interactive.map(|i| i.kind),
            page: click.page,
            action_description: click.action_description,
        }
    }
}

/// Data of a `hover` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverEventData {
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive_kind: Option<ElementKind>,
    pub dwell_ms: u64,
    pub page: String,
    pub action_description: String,
}

/// Data of a `mousemove` sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseMoveEventData {
    pub x: i32,
    pub y: i32,
    pub page_x: i32,
    pub page_y: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub page: String,
    pub action_description: String,
}

/// Data of a semantic tracking call: the caller's details plus context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticEventData<T> {
    #[serde(flatten)]
    pub details: T,
    pub page: String,
    pub action_description: String,
}

/// Session lifecycle events sent to the session endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Start,
    Resume,
    Idle,
    VisibilityHidden,
    VisibilityVisible,
    End,
}

/// Body of a session endpoint request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub event: SessionEventKind,
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    /// Idle threshold in seconds (`idle` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_time: Option<u64>,
    /// Seconds spent idle before activity resumed (`resume` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_duration_seconds: Option<u64>,
    /// Session length in seconds (`end` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl SessionPayload {
    /// Creates a payload with no extras, stamped with the current time.
    #[must_use]
    pub fn new(event: SessionEventKind, session_id: Uuid) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
            session_id,
            idle_time: None,
            idle_duration_seconds: None,
            duration_seconds: None,
        }
    }
}

/// Body of a page-view request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageViewPayload {
    pub page: String,
    pub profile_name: Option<String>,
    pub referrer: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub action_description: String,
}

/// Body of an error request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub source: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack: Option<String>,
    pub page: String,
    pub timestamp: DateTime<Utc>,
}
