//! Interaction signals forwarded by the host application.
//!
//! Every signal is an [`InteractionEvent`]. The enum is internally tagged by
//! `kind`, so a replay log line reads like
//! `{"kind":"click","target":{"tag":"button"},"x":10,"y":20}`.

use serde::{Deserialize, Serialize};

use crate::dom::Element;

/// Modifier keys held during a pointer interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
}

impl Modifiers {
    /// Display labels of the held keys, in Ctrl, Shift, Alt, Cmd order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.ctrl_key, "Ctrl"),
            (self.shift_key, "Shift"),
            (self.alt_key, "Alt"),
            (self.meta_key, "Cmd"),
        ]
        .into_iter()
        .filter_map(|(held, label)| held.then_some(label))
        .collect()
    }
}

/// A click, right click or double click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub target: Element,
    /// Viewport coordinates.
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Document coordinates; equal to the viewport ones when the page is not scrolled.
    #[serde(default)]
    pub page_x: Option<i32>,
    #[serde(default)]
    pub page_y: Option<i32>,
    /// Button code: 0 primary, 1 auxiliary, 2 secondary.
    #[serde(default)]
    pub button: i16,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerInput {
    #[must_use]
    pub fn new(target: Element, x: i32, y: i32) -> Self {
        Self {
            target,
            x,
            y,
            page_x: None,
            page_y: None,
            button: 0,
            modifiers: Modifiers::default(),
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_page_position(mut self, page_x: i32, page_y: i32) -> Self {
        self.page_x = Some(page_x);
        self.page_y = Some(page_y);
        self
    }

    #[must_use]
    pub fn page_position(&self) -> (i32, i32) {
        (self.page_x.unwrap_or(self.x), self.page_y.unwrap_or(self.y))
    }
}

/// A pointer movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub page_x: Option<i32>,
    #[serde(default)]
    pub page_y: Option<i32>,
    #[serde(default)]
    pub target: Option<Element>,
}

impl MoveInput {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            page_x: None,
            page_y: None,
            target: None,
        }
    }
}

/// Low-level activity that keeps the session active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PointerMove,
    PointerDown,
    KeyPress,
    Scroll,
    Touch,
}

/// Visibility of the host page or window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
}

/// A page or tab view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub page: String,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

/// Switch between in-page tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSwitch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_tab: Option<String>,
    pub to_tab: String,
}

/// A modal dialog being opened or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modal {
    pub modal: String,
}

/// A submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmit {
    pub form: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_count: Option<u32>,
}

/// A search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u64>,
}

/// A filter applied to a list or table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

/// A collapsible section being expanded or collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub section: String,
}

/// A file download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An uncaught application error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub stack: Option<String>,
}

/// An unhandled promise rejection or failed background task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    #[serde(default)]
    pub stack: Option<String>,
}

/// A signal from the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionEvent {
    Click(PointerInput),
    RightClick(PointerInput),
    DoubleClick(PointerInput),
    MouseOver { target: Element },
    MouseOut { target: Element },
    MouseMove(MoveInput),
    Activity { activity: ActivityKind },
    Visibility { state: Visibility },
    PageView(PageView),
    TabSwitch(TabSwitch),
    ModalOpen(Modal),
    ModalClose(Modal),
    FormSubmit(FormSubmit),
    Search(Search),
    Filter(Filter),
    Expand(Section),
    Collapse(Section),
    Download(Download),
    Error(ErrorReport),
    UnhandledRejection(Rejection),
    Unload,
}

impl InteractionEvent {
    /// The activity this signal represents for idle tracking, if any.
    ///
    /// A click implies the pointer-down that preceded it.
    #[must_use]
    pub fn activity(&self) -> Option<ActivityKind> {
        match self {
            Self::MouseMove(_) => Some(ActivityKind::PointerMove),
            Self::Click(_) | Self::RightClick(_) | Self::DoubleClick(_) => {
                Some(ActivityKind::PointerDown)
            }
            Self::Activity { activity } => Some(*activity),
            _ => None,
        }
    }
}
