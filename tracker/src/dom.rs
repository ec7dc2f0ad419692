//! Owned snapshot of the element that received an interaction.
//!
//! The host hands the tracker an [`Element`] together with its ancestor
//! chain. Each element owns its parent, so a snapshot is self-contained and
//! can be cloned into pending hover state or deserialized from a replay log.
//!
//! ```
//! use pulsetrail_tracker::dom::Element;
//!
//! let nav = Element::new("nav").with_id("main-nav");
//! let link = Element::new("a")
//!     .with_class("nav-link")
//!     .with_attr("href", "/reports")
//!     .with_text("Reports")
//!     .with_parent(nav);
//!
//! assert_eq!(link.ancestors().count(), 2);
//! assert_eq!(link.attr("href"), Some("/reports"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// An element in the host's UI tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Tag name. Stored lowercase.
    #[serde(deserialize_with = "lowercase")]
    pub tag: String,

    /// Element id; an empty id is treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Class list in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,

    /// Remaining attributes (`href`, `role`, `type`, `data-*`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Parent element, `None` at the root of the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Element>>,
}

impl Element {
    /// Creates an element with the given tag and nothing else.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Element) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Returns the id if it is present and non-empty.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the first class, if any.
    #[must_use]
    pub fn first_class(&self) -> Option<&str> {
        self.classes
            .iter()
            .map(String::as_str)
            .find(|c| !c.is_empty())
    }

    /// Returns the class list joined by spaces, as a `class` attribute would read.
    #[must_use]
    pub fn class_name(&self) -> String {
        self.classes.join(" ")
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Declared ARIA role, if any.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.attr("role").filter(|r| !r.is_empty())
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Element> {
        self.parent.as_deref()
    }

    /// Iterates over this element followed by each of its ancestors.
    pub fn ancestors(&self) -> impl Iterator<Item = &Element> {
        std::iter::successors(Some(self), |el| el.parent())
    }

    /// Returns the nearest element, starting with `self`, matching `predicate`.
    pub fn closest<P>(&self, predicate: P) -> Option<&Element>
    where
        P: FnMut(&&Element) -> bool,
    {
        self.ancestors().find(predicate)
    }

    /// Iterates over `data-*` attributes in name order.
    pub fn data_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter(|(name, _)| name.starts_with("data-"))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// DOM `tagName` is uppercase for HTML elements.
fn lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|tag| tag.to_ascii_lowercase())
}
