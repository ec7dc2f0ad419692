//! Ancestor-path identifiers for interaction targets.
//!
//! [`resolve_path`] walks from an element up through at most
//! [`MAX_PATH_DEPTH`] levels, producing a selector-like string such as
//! `section#reports > div.card > button.btn`. The walk stops at the first
//! element with a non-empty id: ids are page-unique, so that token alone
//! anchors the path and nothing above it is included.

use crate::dom::Element;

/// Maximum number of elements (the target included) in a path.
pub const MAX_PATH_DEPTH: usize = 10;

/// Separator between path tokens.
pub const PATH_SEPARATOR: &str = " > ";

/// Builds the path token for a single element: `tag`, `tag#id` or `tag.class`.
fn token(el: &Element) -> String {
    if let Some(id) = el.id() {
        return format!("{}#{}", el.tag, id);
    }
    match el.first_class() {
        Some(class) => format!("{}.{}", el.tag, class),
        None => el.tag.clone(),
    }
}

/// Resolves the bounded ancestor path of `el`.
///
/// Tokens are rendered outermost first. The id-bearing element that ends
/// the walk, if any, is therefore the leftmost token.
///
/// ```
/// use pulsetrail_tracker::dom::Element;
/// use pulsetrail_tracker::path::resolve_path;
///
/// let button = Element::new("button")
///     .with_class("btn")
///     .with_parent(Element::new("div").with_class("card").with_parent(
///         Element::new("section").with_id("reports").with_parent(Element::new("body")),
///     ));
///
/// assert_eq!(resolve_path(&button), "section#reports > div.card > button.btn");
/// ```
#[must_use]
pub fn resolve_path(el: &Element) -> String {
    let mut tokens = Vec::with_capacity(MAX_PATH_DEPTH);

    for current in el.ancestors().take(MAX_PATH_DEPTH) {
        tokens.push(token(current));
        if current.id().is_some() {
            break;
        }
    }

    tokens.reverse();
    tokens.join(PATH_SEPARATOR)
}
