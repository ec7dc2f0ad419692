//! Integration tests for JSON-lines replay.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use pulsetrail_tracker::config::TrackerConfig;
use pulsetrail_tracker::replay::{replay_lines, ReplayStats};
use pulsetrail_tracker::sender::{Endpoint, MemoryTransport};
use pulsetrail_tracker::tracker::Tracker;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tokio::io::BufReader;

// =============================================================================
// Test Helpers
// =============================================================================

const RECORDED_SESSION: &str = r#"
{"kind":"page_view","page":"budget","profile_name":"Household"}
{"kind":"click","target":{"tag":"button","id":"add-expense","classes":["btn"],"text":"Add expense"},"x":120,"y":48}
{"kind":"modal_open","modal":"New expense"}
{"kind":"form_submit","form":"expense-form","field_count":4}
this line is not a signal
{"kind":"search","query":"groceries","result_count":12}

{"kind":"error","message":"TypeError: amount is NaN","line":31,"column":4}
"#;

fn write_session(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn start(batch_size: usize) -> (Tracker, MemoryTransport) {
    let mut config = TrackerConfig::new("https://app.example.com/api/events");
    config.batch_size = batch_size;
    let transport = MemoryTransport::new();
    let tracker = Tracker::start(config, Arc::new(transport.clone())).expect("valid config");
    (tracker, transport)
}

// =============================================================================
// Replay Tests
// =============================================================================

#[tokio::test]
async fn test_replay_file() {
    let file = write_session(RECORDED_SESSION);
    let (tracker, transport) = start(10);

    let reader = BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
    let stats = replay_lines(reader, &tracker).await.unwrap();

    assert_eq!(
        stats,
        ReplayStats {
            lines: 7,
            dispatched: 6,
            dropped: 0,
            malformed: 1,
        }
    );

    tracker.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let views = transport.requests_to(Endpoint::PageView);
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["page"], json!("budget"));

    let errors = transport.requests_to(Endpoint::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["page"], json!("budget"));

    // Residual queue delivered at teardown, in input order.
    let batches = transport.requests_to(Endpoint::Batch);
    assert_eq!(batches.len(), 1);
    let types: Vec<&str> = batches[0]["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["click", "modal_open", "form_submit", "search"]);
    assert_eq!(
        batches[0]["events"][0]["data"]["action_description"],
        json!("Clicked \"Add expense\" button")
    );
}

#[tokio::test]
async fn test_replay_stops_dispatching_after_unload() {
    let file = write_session(
        "{\"kind\":\"expand\",\"section\":\"History\"}\n{\"kind\":\"unload\"}\n",
    );
    let (tracker, transport) = start(10);

    let reader = BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
    let stats = replay_lines(reader, &tracker).await.unwrap();
    assert_eq!(stats.dispatched, 2);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!tracker.track_collapse("History"));

    let sessions = transport.requests_to(Endpoint::Session);
    assert!(sessions.iter().any(|s| s["event"] == json!("end")));
}

/// Replay waits for channel space, so input larger than the channel is
/// delivered in full.
#[tokio::test]
async fn test_replay_larger_than_channel() {
    let mut config = TrackerConfig::new("https://app.example.com/api/events");
    config.channel_capacity = 4;
    let transport = MemoryTransport::new();
    let tracker = Tracker::start(config, Arc::new(transport.clone())).unwrap();

    let input: String = (0..500)
        .map(|n| {
            format!(
                "{{\"kind\":\"click\",\"target\":{{\"tag\":\"button\",\"id\":\"row-{n}\"}}}}\n"
            )
        })
        .collect();
    let stats = replay_lines(BufReader::new(input.as_bytes()), &tracker).await.unwrap();

    assert_eq!(stats.lines, 500);
    assert_eq!(stats.dispatched, 500);
    assert_eq!(stats.dropped, 0);

    tracker.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let ids: Vec<String> = transport
        .requests_to(Endpoint::Batch)
        .iter()
        .flat_map(|body| body["events"].as_array().cloned().unwrap_or_default())
        .map(|e| e["data"]["element_id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids.len(), 500);
    assert!(ids.contains(&"row-0".to_string()));
    assert!(ids.contains(&"row-499".to_string()));
}

/// Line offsets replay the recorded timing, so hovers dwell and the session
/// goes idle.
#[tokio::test(start_paused = true)]
async fn test_replay_honours_offsets() {
    let mut config = TrackerConfig::new("https://app.example.com/api/events");
    config.track_hover = true;
    let transport = MemoryTransport::new();
    let tracker = Tracker::start(config, Arc::new(transport.clone())).unwrap();

    let input = r#"
{"at_ms":0,"kind":"mouse_over","target":{"tag":"DIV","id":"plan","classes":["card"]}}
{"at_ms":1500,"kind":"click","target":{"tag":"BUTTON","id":"save","text":"Save"}}
{"at_ms":400000,"kind":"activity","activity":"key_press"}
"#;
    let stats = replay_lines(BufReader::new(input.as_bytes()), &tracker).await.unwrap();
    assert_eq!(stats.dispatched, 3);

    tracker.shutdown().await.unwrap();

    let sessions: Vec<Value> = transport.requests_to(Endpoint::Session);
    let kinds: Vec<&str> = sessions.iter().filter_map(|s| s["event"].as_str()).collect();
    assert_eq!(kinds, vec!["start", "idle", "resume", "end"]);

    let events: Vec<Value> = transport
        .requests_to(Endpoint::Batch)
        .into_iter()
        .flat_map(|body| body["events"].as_array().cloned().unwrap_or_default())
        .collect();
    let types: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert_eq!(types, vec!["hover", "click"]);
    assert_eq!(events[1]["data"]["action_description"], json!("Clicked \"Save\" button"));
}

#[tokio::test]
async fn test_replay_empty_input() {
    let (tracker, _transport) = start(10);

    let stats = replay_lines(BufReader::new(&b""[..]), &tracker).await.unwrap();
    assert_eq!(stats, ReplayStats::default());
}
