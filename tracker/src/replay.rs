//! Feeding recorded host signals into a tracker.
//!
//! Input is JSON lines, one [`InteractionEvent`] per line, as produced by a
//! host that logs what it forwards:
//!
//! ```text
//! {"kind":"page_view","page":"dashboard"}
//! {"kind":"click","target":{"tag":"button","id":"save","text":"Save"},"x":10,"y":20}
//! {"kind":"visibility","state":"hidden"}
//! ```
//!
//! Blank lines are skipped. Lines that do not parse are logged and skipped.
//!
//! A line may carry `at_ms`, its offset from the start of the recording.
//! Replay sleeps until that offset before dispatching, so hover dwell,
//! pointer sampling and idle detection see the recorded timing. Lines without
//! an offset are dispatched as soon as they are read, which collapses every
//! timing-driven source: only the first `mouse_move` of a burst survives
//! sampling, hovers never dwell and the session never goes idle.
//!
//! Replay waits for channel space instead of dropping signals.

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::input::InteractionEvent;
use crate::tracker::Tracker;

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-blank lines read.
    pub lines: usize,
    /// Signals the tracker accepted.
    pub dispatched: usize,
    /// Signals refused because the tracker had already stopped.
    pub dropped: usize,
    /// Lines that were not valid signals.
    pub malformed: usize,
}

/// One recorded signal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayLine {
    /// Offset from the start of the recording, in milliseconds.
    #[serde(default)]
    pub at_ms: Option<u64>,
    #[serde(flatten)]
    pub event: InteractionEvent,
}

/// Parses one line. Returns `None` for blank lines.
///
/// # Errors
///
/// Returns the parse error for a non-blank line that is not a valid signal.
pub fn parse_line(line: &str) -> Option<Result<ReplayLine, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Dispatches every signal in `reader` to `tracker`.
///
/// # Errors
///
/// Returns an I/O error if reading fails. Malformed lines are not errors.
pub async fn replay_lines<R>(reader: R, tracker: &Tracker) -> std::io::Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut lines = reader.lines();
    let started = Instant::now();

    while let Some(line) = lines.next_line().await? {
        let Some(parsed) = parse_line(&line) else {
            continue;
        };
        stats.lines += 1;

        match parsed {
            Ok(ReplayLine { at_ms, event }) => {
                if let Some(offset) = at_ms {
                    sleep_until(started + Duration::from_millis(offset)).await;
                }
                if tracker.dispatch_wait(event).await {
                    stats.dispatched += 1;
                } else {
                    stats.dropped += 1;
                }
            }
            Err(e) => {
                warn!(line = stats.lines, error = %e, "Skipping malformed line");
                stats.malformed += 1;
            }
        }
    }

    debug!(?stats, "Replay input exhausted");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_line("   ").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn parses_signal_lines() {
        let line = parse_line(r#"{"kind":"unload"}"#).unwrap().unwrap();
        assert_eq!(line.event, InteractionEvent::Unload);
        assert_eq!(line.at_ms, None);

        let line = parse_line(r#" {"kind":"visibility","state":"hidden"} "#)
            .unwrap()
            .unwrap();
        assert!(matches!(line.event, InteractionEvent::Visibility { .. }));
    }

    #[test]
    fn parses_offset() {
        let line = parse_line(r#"{"at_ms":1500,"kind":"activity","activity":"scroll"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.at_ms, Some(1_500));
        assert!(matches!(
            line.event,
            InteractionEvent::Activity {
                activity: crate::input::ActivityKind::Scroll
            }
        ));
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(parse_line(r#"{"kind":"teleport"}"#).unwrap().is_err());
        assert!(parse_line("not json").unwrap().is_err());
    }
}
