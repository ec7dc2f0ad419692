//! Sanitization applied to captured values before they are queued.
//!
//! # Guarantees
//!
//! - **Bounded text**: element text is whitespace-collapsed and truncated to
//!   [`MAX_TEXT_LEN`] characters; classes, search queries and stacks have
//!   their own limits.
//! - **Custom attributes**: at most [`MAX_CUSTOM_ATTRIBUTES`] `data-*`
//!   attributes are kept, with the `data-` prefix stripped and values
//!   truncated to [`MAX_ATTRIBUTE_VALUE_LEN`].
//! - **Sensitive names dropped**: attributes whose name mentions a
//!   credential or personal identifier are never transmitted.
//!
//! ```
//! use pulsetrail_tracker::dom::Element;
//! use pulsetrail_tracker::privacy::custom_attributes;
//!
//! let el = Element::new("tr")
//!     .with_attr("data-row-id", "42")
//!     .with_attr("data-auth-token", "abc123");
//!
//! let attrs = custom_attributes(&el);
//! assert_eq!(attrs.get("row-id").map(String::as_str), Some("42"));
//! assert!(!attrs.contains_key("auth-token"));
//! ```

use std::collections::BTreeMap;

use tracing::trace;

use crate::dom::Element;

/// Maximum length of an element text snippet.
pub const MAX_TEXT_LEN: usize = 50;

/// Maximum length of a class string.
pub const MAX_CLASS_LEN: usize = 200;

/// Maximum number of custom attributes attached to a click.
pub const MAX_CUSTOM_ATTRIBUTES: usize = 5;

/// Maximum length of a custom attribute value.
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 100;

/// Maximum length of a search query or free-form label.
pub const MAX_QUERY_LEN: usize = 100;

/// Maximum length of an error stack.
pub const MAX_STACK_LEN: usize = 1000;

/// Attribute name fragments that mark a value as sensitive.
const SENSITIVE_NAME_FRAGMENTS: &[&str] = &[
    "password", "passwd", "token", "secret", "auth", "session", "email", "ssn", "card-number",
];

/// Truncates `value` to at most `max` characters, respecting char boundaries.
#[must_use]
pub fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Collapses runs of whitespace and truncates to [`MAX_TEXT_LEN`].
///
/// Returns `None` for text that is empty after trimming.
#[must_use]
pub fn text_snippet(text: Option<&str>) -> Option<String> {
    let collapsed = text?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(truncate(&collapsed, MAX_TEXT_LEN))
    }
}

/// Returns the class string of `el` bounded to [`MAX_CLASS_LEN`].
#[must_use]
pub fn class_string(el: &Element) -> Option<String> {
    let classes = el.class_name();
    if classes.is_empty() {
        None
    } else {
        Some(truncate(&classes, MAX_CLASS_LEN))
    }
}

/// Returns `true` if an attribute name suggests its value is sensitive.
#[must_use]
pub fn is_sensitive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_NAME_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Extracts up to [`MAX_CUSTOM_ATTRIBUTES`] sanitized `data-*` attributes.
#[must_use]
pub fn custom_attributes(el: &Element) -> BTreeMap<String, String> {
    el.data_attributes()
        .filter_map(|(name, value)| {
            let key = name.trim_start_matches("data-");
            if key.is_empty() {
                return None;
            }
            if is_sensitive_name(key) {
                trace!(attribute = name, "Dropping sensitive attribute");
                return None;
            }
            Some((key.to_string(), truncate(value, MAX_ATTRIBUTE_VALUE_LEN)))
        })
        .take(MAX_CUSTOM_ATTRIBUTES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 7), "héllo w");
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn text_snippet_collapses_whitespace() {
        assert_eq!(
            text_snippet(Some("  Save\n   changes  ")),
            Some("Save changes".to_string())
        );
    }

    #[test]
    fn text_snippet_is_bounded() {
        let long = "x".repeat(80);
        assert_eq!(text_snippet(Some(&long)).map(|s| s.chars().count()), Some(MAX_TEXT_LEN));
    }

    #[test]
    fn text_snippet_empty_is_none() {
        assert_eq!(text_snippet(Some("   \n ")), None);
        assert_eq!(text_snippet(None), None);
    }

    #[test]
    fn class_string_joins_and_bounds() {
        let el = Element::new("div").with_class("btn").with_class("btn-primary");
        assert_eq!(class_string(&el), Some("btn btn-primary".to_string()));
        assert_eq!(class_string(&Element::new("div")), None);
    }

    #[test]
    fn sensitive_names_detected() {
        assert!(is_sensitive_name("user-password"));
        assert!(is_sensitive_name("csrfToken"));
        assert!(is_sensitive_name("Email"));
        assert!(!is_sensitive_name("row-id"));
    }

    #[test]
    fn custom_attributes_capped_at_five() {
        let el = (0..8).fold(Element::new("div"), |el, i| {
            el.with_attr(format!("data-field{i}"), format!("v{i}"))
        });
        let attrs = custom_attributes(&el);
        assert_eq!(attrs.len(), MAX_CUSTOM_ATTRIBUTES);
        assert_eq!(attrs.get("field0").map(String::as_str), Some("v0"));
    }

    #[test]
    fn custom_attribute_values_truncated() {
        let el = Element::new("div").with_attr("data-note", "n".repeat(300));
        let attrs = custom_attributes(&el);
        assert_eq!(attrs["note"].len(), MAX_ATTRIBUTE_VALUE_LEN);
    }

    #[test]
    fn non_data_attributes_ignored() {
        let el = Element::new("a").with_attr("href", "/x").with_attr("title", "t");
        assert!(custom_attributes(&el).is_empty());
    }
}
