//! Integration tests for the HTTP transport against a mock ingestion service.

use std::sync::Arc;
use std::time::Duration;

use pulsetrail_tracker::config::TrackerConfig;
use pulsetrail_tracker::dom::Element;
use pulsetrail_tracker::input::{InteractionEvent, PointerInput};
use pulsetrail_tracker::sender::{Endpoint, HttpTransport, Transport, TransportError};
use pulsetrail_tracker::tracker::Tracker;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

const SOURCE_ID: &str = "test-client";

fn create_transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(
        format!("{}/api/events", server.uri()),
        SOURCE_ID,
        Duration::from_secs(5),
    )
    .expect("valid transport")
}

async fn mount_ok(server: &MockServer, route: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Polls until `server` has seen `count` requests to `route`, or gives up.
async fn wait_for_requests(server: &MockServer, route: &str, count: usize) -> Vec<Request> {
    for _ in 0..100 {
        let received: Vec<Request> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .collect();
        if received.len() >= count {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {count} request(s) to {route}");
}

// =============================================================================
// Transport Tests
// =============================================================================

/// Each endpoint maps to its route under the base URL, with JSON headers.
#[tokio::test]
async fn test_routes_and_headers() {
    let server = MockServer::start().await;
    for (route, endpoint) in [
        ("/api/events/batch", Endpoint::Batch),
        ("/api/events/session", Endpoint::Session),
        ("/api/events/page-view", Endpoint::PageView),
        ("/api/events/error", Endpoint::Error),
    ] {
        Mock::given(method("POST"))
            .and(path(route))
            .and(header("content-type", "application/json"))
            .and(header("x-source-id", SOURCE_ID))
            .and(body_json(json!({"endpoint": endpoint.to_string()})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let transport = create_transport(&server);
    for endpoint in [Endpoint::Batch, Endpoint::Session, Endpoint::PageView, Endpoint::Error] {
        let result = transport
            .post(endpoint, json!({"endpoint": endpoint.to_string()}))
            .await;
        assert!(result.is_ok(), "{endpoint} failed: {result:?}");
    }
}

/// A non-success status is reported as a failed send.
#[tokio::test]
async fn test_error_status_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/batch"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = create_transport(&server);
    let err = transport
        .post(Endpoint::Batch, json!({"events": []}))
        .await
        .unwrap_err();

    assert!(
        matches!(err, TransportError::Status { status: 503, ref endpoint } if endpoint == "batch"),
        "unexpected error: {err:?}"
    );
}

/// The teardown path uses the same route as a normal send.
#[tokio::test]
async fn test_beacon_posts_to_session() {
    let server = MockServer::start().await;
    mount_ok(&server, "/api/events/session").await;

    let transport = create_transport(&server);
    tokio_test::assert_ok!(
        transport
            .beacon(Endpoint::Session, json!({"event": "end", "duration_seconds": 12}))
            .await
    );

    let received = wait_for_requests(&server, "/api/events/session", 1).await;
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["event"], json!("end"));
}

/// An unreachable service is a failed send, not a panic.
#[tokio::test]
async fn test_unreachable_service() {
    let transport = HttpTransport::new(
        "http://127.0.0.1:9/api/events",
        SOURCE_ID,
        Duration::from_millis(500),
    )
    .unwrap();

    let err = transport.post(Endpoint::Error, json!({})).await.unwrap_err();
    assert!(matches!(err, TransportError::Http(_)));
}

// =============================================================================
// End-to-End
// =============================================================================

/// A tracker over HTTP delivers start, a full batch, and the end payload.
#[tokio::test]
async fn test_tracker_over_http() {
    let server = MockServer::start().await;
    mount_ok(&server, "/api/events/session").await;
    mount_ok(&server, "/api/events/batch").await;

    let mut config = TrackerConfig::new(format!("{}/api/events", server.uri()));
    config.source_id = SOURCE_ID.to_string();
    config.batch_size = 2;
    let transport = create_transport(&server);
    let tracker = Tracker::start(config, Arc::new(transport)).unwrap();

    for id in ["export", "import"] {
        let target = Element::new("button").with_id(id).with_text(id);
        tracker.dispatch(InteractionEvent::Click(PointerInput::new(target, 0, 0)));
    }

    let batches = wait_for_requests(&server, "/api/events/batch", 1).await;
    let body: Value = serde_json::from_slice(&batches[0].body).unwrap();
    let ids: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["data"]["element_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["export", "import"]);
    assert_eq!(
        batches[0].headers.get("x-source-id").and_then(|v| v.to_str().ok()),
        Some(SOURCE_ID)
    );

    tracker.shutdown().await.unwrap();

    let sessions = wait_for_requests(&server, "/api/events/session", 2).await;
    let events: Vec<String> = sessions
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["event"].to_string())
        .collect();
    assert!(events.contains(&"\"start\"".to_string()));
    assert!(events.contains(&"\"end\"".to_string()));
}
