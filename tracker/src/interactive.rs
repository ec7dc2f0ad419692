//! Interactive-element detection and classification.
//!
//! A click is attributed to the nearest element (target included) that
//! matches a fixed predicate set. The match is then classified so that
//! descriptions and classification-specific fields can be produced.

use serde::{Deserialize, Serialize};

use crate::dom::Element;

/// Tags that are interactive on their own.
const INTERACTIVE_TAGS: &[&str] = &["button", "a", "input", "select", "textarea"];

/// ARIA roles that mark an element as interactive.
const INTERACTIVE_ROLES: &[&str] = &["button", "tab", "link", "menuitem", "option"];

/// Class markers used by the application for clickable elements.
const INTERACTIVE_CLASSES: &[&str] = &["btn", "nav-link", "tab", "dropdown-item", "clickable"];

/// Attributes whose presence makes an element clickable.
const CLICKABLE_ATTRIBUTES: &[&str] = &["onclick", "data-action", "data-toggle", "data-bs-toggle"];

/// Class markers that make an element worth recording on hover.
const HOVER_MARKER_CLASSES: &[&str] = &[
    "btn",
    "nav-link",
    "tab",
    "card",
    "dropdown-item",
    "clickable",
];

/// Classification of an interactive element, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Tab,
    DropdownItem,
    Nav,
    Link,
    Button,
    Input,
    Select,
    Textarea,
    Generic,
}

impl ElementKind {
    /// Human-readable noun used in descriptions.
    #[must_use]
    pub fn noun(self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::DropdownItem => "dropdown item",
            Self::Nav => "navigation item",
            Self::Link => "link",
            Self::Button => "button",
            Self::Input => "input",
            Self::Select => "dropdown",
            Self::Textarea => "text area",
            Self::Generic => "element",
        }
    }
}

/// Returns `true` if `el` itself satisfies the interactive predicate set.
#[must_use]
pub fn is_interactive(el: &Element) -> bool {
    INTERACTIVE_TAGS.contains(&el.tag.as_str())
        || el.role().is_some_and(|r| INTERACTIVE_ROLES.contains(&r))
        || INTERACTIVE_CLASSES.iter().any(|c| el.has_class(c))
        || CLICKABLE_ATTRIBUTES.iter().any(|a| el.has_attr(a))
}

/// Finds the nearest interactive element, starting with `target` itself.
#[must_use]
pub fn find_interactive(target: &Element) -> Option<&Element> {
    target.closest(|el| is_interactive(el))
}

/// Returns `true` if hovering `el` is worth recording.
#[must_use]
pub fn is_hover_worthy(el: &Element) -> bool {
    INTERACTIVE_TAGS.contains(&el.tag.as_str())
        || el.role().is_some()
        || HOVER_MARKER_CLASSES.iter().any(|c| el.has_class(c))
}

/// Classifies an interactive element. The first matching rule wins.
#[must_use]
pub fn classify(el: &Element) -> ElementKind {
    let toggle = el.attr("data-bs-toggle").or_else(|| el.attr("data-toggle"));

    if el.role() == Some("tab") || toggle == Some("tab") || el.has_class("tab") {
        ElementKind::Tab
    } else if el.has_class("dropdown-item")
        || el.role() == Some("menuitem")
        || el.role() == Some("option")
    {
        ElementKind::DropdownItem
    } else if el.has_class("nav-link") {
        ElementKind::Nav
    } else if el.tag == "a" || el.role() == Some("link") {
        ElementKind::Link
    } else if el.tag == "button" || el.role() == Some("button") || el.has_class("btn") {
        ElementKind::Button
    } else if el.tag == "input" {
        ElementKind::Input
    } else if el.tag == "select" {
        ElementKind::Select
    } else if el.tag == "textarea" {
        ElementKind::Textarea
    } else {
        ElementKind::Generic
    }
}
