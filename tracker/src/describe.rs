//! Human-readable descriptions of captured events.
//!
//! The sentences produced here travel with each event as
//! `action_description` and are rendered verbatim by the timeline viewer.
//! Every function is pure.

use reqwest::Url;

use crate::input::{Download, Filter, FormSubmit, Modal, PageView, Search, Section, TabSwitch};
use crate::interactive::ElementKind;
use crate::privacy::truncate;
use crate::types::{ClickEventData, InteractiveElement};

/// Maximum length of the path shown for a cross-origin link destination.
pub const MAX_DESTINATION_PATH_LEN: usize = 30;

/// The kind of pointer interaction being described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    Click,
    RightClick,
    DoubleClick,
}

impl ClickAction {
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Click => "Clicked",
            Self::RightClick => "Right-clicked",
            Self::DoubleClick => "Double-clicked",
        }
    }
}

/// Describes a click, right click or double click.
///
/// Interactive targets use the template of their classification; other
/// targets fall back to tag and text, then tag and id, then tag and
/// coordinates. Held modifier keys are appended as `with Ctrl+Shift`.
#[must_use]
pub fn describe_click(data: &ClickEventData, action: ClickAction, origin: Option<&Url>) -> String {
    let mut sentence = data
        .interactive
        .as_ref()
        .and_then(|el| describe_interactive(el, action, origin))
        .unwrap_or_else(|| describe_target(data, action.verb()));

    let labels = data.modifiers.labels();
    if !labels.is_empty() {
        sentence.push_str(" with ");
        sentence.push_str(&labels.join("+"));
    }
    sentence
}

fn describe_interactive(
    el: &InteractiveElement,
    action: ClickAction,
    origin: Option<&Url>,
) -> Option<String> {
    let verb = action.verb();
    let text = el.text.as_deref();
    let name = el.name.as_deref().or(text).or(el.id.as_deref());

    let sentence = match el.kind {
        ElementKind::Button => match (text, el.id.as_deref()) {
            (Some(t), _) => format!("{verb} \"{t}\" button"),
            (None, Some(id)) => format!("{verb} button #{id}"),
            (None, None) => format!("{verb} a button"),
        },
        ElementKind::Link => {
            let mut s = match text {
                Some(t) => format!("{verb} \"{t}\" link"),
                None => format!("{verb} a link"),
            };
            if let Some(href) = el.target_url.as_deref().filter(|h| is_navigable(h)) {
                s.push_str(" to ");
                s.push_str(&shorten_destination(href, origin));
            }
            s
        }
        ElementKind::Tab => match (name, action) {
            (Some(n), ClickAction::Click) => format!("Switched to \"{n}\" tab"),
            (Some(n), _) => format!("{verb} \"{n}\" tab"),
            (None, _) => format!("{verb} a tab"),
        },
        ElementKind::Nav => match name {
            Some(n) => format!("{verb} \"{n}\" in navigation"),
            None => format!("{verb} a navigation item"),
        },
        ElementKind::DropdownItem => match (name, action) {
            (Some(n), ClickAction::Click) => format!("Selected \"{n}\" from dropdown"),
            (Some(n), _) => format!("{verb} \"{n}\" dropdown item"),
            (None, _) => format!("{verb} a dropdown item"),
        },
        ElementKind::Input => {
            let input_type = el.input_type.as_deref().unwrap_or("text");
            match (input_type, name, action) {
                ("checkbox" | "radio", Some(n), ClickAction::Click) => {
                    format!("Toggled {input_type} \"{n}\"")
                }
                (_, Some(n), _) => format!("{verb} {input_type} input \"{n}\""),
                (_, None, _) => format!("{verb} {input_type} input"),
            }
        }
        ElementKind::Select => match name {
            Some(n) => format!("{verb} \"{n}\" dropdown"),
            None => format!("{verb} a dropdown"),
        },
        ElementKind::Textarea => match name {
            Some(n) => format!("{verb} text area \"{n}\""),
            None => format!("{verb} a text area"),
        },
        ElementKind::Generic => format!("{verb} \"{}\"", text?),
    };
    Some(sentence)
}

fn describe_target(data: &ClickEventData, verb: &str) -> String {
    let tag = &data.element_type;
    match (data.element_text.as_deref(), data.element_id.as_deref()) {
        (Some(text), _) => format!("{verb} on {tag} \"{text}\""),
        (None, Some(id)) => format!("{verb} on {tag} #{id}"),
        (None, None) => format!("{verb} on {tag} at ({}, {})", data.x, data.y),
    }
}

/// Returns `false` for in-page anchors and script pseudo-links.
fn is_navigable(href: &str) -> bool {
    let href = href.trim();
    !(href.is_empty()
        || href.starts_with('#')
        || href.to_ascii_lowercase().starts_with("javascript:"))
}

/// Shortens a link destination for display.
///
/// Same-origin destinations (including relative hrefs) keep path and query.
/// Cross-origin destinations show the host followed by the path truncated
/// to [`MAX_DESTINATION_PATH_LEN`] characters.
///
/// ```
/// use pulsetrail_tracker::describe::shorten_destination;
/// use reqwest::Url;
///
/// let origin = Url::parse("https://app.example.com/dashboard").unwrap();
/// assert_eq!(
///     shorten_destination("https://app.example.com/reports?year=2024#top", Some(&origin)),
///     "/reports?year=2024"
/// );
/// assert_eq!(shorten_destination("https://docs.rs/tokio", Some(&origin)), "docs.rs/tokio");
/// ```
#[must_use]
pub fn shorten_destination(href: &str, origin: Option<&Url>) -> String {
    let resolved = match origin {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };

    let Ok(url) = resolved else {
        // Relative href with no known origin: it is same-origin by definition.
        return href.to_string();
    };

    if origin.is_some_and(|base| base.origin() == url.origin()) {
        return match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
    }

    let Some(host) = url.host_str() else {
        return truncate(href, MAX_DESTINATION_PATH_LEN);
    };

    let path = url.path();
    if path == "/" {
        return host.to_string();
    }
    let short = truncate(path, MAX_DESTINATION_PATH_LEN);
    if short.len() < path.len() {
        format!("{host}{short}...")
    } else {
        format!("{host}{path}")
    }
}

/// Describes a hover that dwelled long enough to be recorded.
#[must_use]
pub fn describe_hover(tag: &str, text: Option<&str>, kind: Option<ElementKind>) -> String {
    match (text, kind) {
        (Some(t), Some(kind)) => format!("Hovered over \"{t}\" {}", kind.noun()),
        (Some(t), None) => format!("Hovered over {tag} \"{t}\""),
        (None, Some(kind)) => format!("Hovered over a {}", kind.noun()),
        (None, None) => format!("Hovered over {tag}"),
    }
}

#[must_use]
pub fn describe_mouse_move(x: i32, y: i32) -> String {
    format!("Moved pointer to ({x}, {y})")
}

#[must_use]
pub fn describe_page_view(view: &PageView) -> String {
    let mut s = format!("Viewed \"{}\" page", view.page);
    if let Some(profile) = view.profile_name.as_deref().filter(|p| !p.is_empty()) {
        s.push_str(&format!(" for profile \"{profile}\""));
    }
    if let Some(referrer) = view.referrer.as_deref().filter(|r| !r.is_empty()) {
        s.push_str(&format!(" (from \"{referrer}\")"));
    }
    s
}

#[must_use]
pub fn describe_tab_switch(switch: &TabSwitch) -> String {
    match switch.from_tab.as_deref() {
        Some(from) => format!("Switched from \"{from}\" to \"{}\" tab", switch.to_tab),
        None => format!("Switched to \"{}\" tab", switch.to_tab),
    }
}

#[must_use]
pub fn describe_modal(modal: &Modal, opened: bool) -> String {
    let verb = if opened { "Opened" } else { "Closed" };
    format!("{verb} \"{}\" dialog", modal.modal)
}

#[must_use]
pub fn describe_form_submit(form: &FormSubmit) -> String {
    match form.field_count {
        Some(1) => format!("Submitted \"{}\" form with 1 field", form.form),
        Some(n) => format!("Submitted \"{}\" form with {n} fields", form.form),
        None => format!("Submitted \"{}\" form", form.form),
    }
}

#[must_use]
pub fn describe_search(search: &Search) -> String {
    match search.result_count {
        Some(1) => format!("Searched for \"{}\" (1 result)", search.query),
        Some(n) => format!("Searched for \"{}\" ({n} results)", search.query),
        None => format!("Searched for \"{}\"", search.query),
    }
}

#[must_use]
pub fn describe_filter(filter: &Filter) -> String {
    format!("Filtered {} by \"{}\"", filter.field, filter.value)
}

#[must_use]
pub fn describe_section(section: &Section, expanded: bool) -> String {
    let verb = if expanded { "Expanded" } else { "Collapsed" };
    format!("{verb} \"{}\" section", section.section)
}

#[must_use]
pub fn describe_download(download: &Download) -> String {
    format!("Downloaded \"{}\"", download.file_name)
}
