use reqwest::Url;
use serde_json::{json, Map};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::Instant;
use trexim_analytics::env::SimulatedPage;
use trexim_analytics::kernel::event::{EventData, TrackedEvent};
use trexim_analytics::kernel::tracker::{Tracker, TrackerInput};
use trexim_analytics::services::ingest::{HttpIngestClient, IngestClient};
use trexim_analytics::{TrackerConfig, TrackerError};

/// Serve exactly one request with a canned JSON answer and hand back the raw request.
async fn one_shot_endpoint(status: &'static str, body: &'static str) -> (TrackerConfig, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });

    let config = TrackerConfig {
        endpoint: format!("http://{addr}/"),
        ..TrackerConfig::default()
    };
    (config, rx)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    body.len() >= length
}

#[tokio::test]
async fn test_create_session_returns_id() {
    let (config, request) = one_shot_endpoint("200 OK", r#"{"status":"ok","session_id":"a1b2c3d4"}"#).await;
    let client = HttpIngestClient::new(&config);

    let id = client.create_session().await.unwrap();
    assert_eq!(id, "a1b2c3d4");

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /api/analytics/session "), "{raw}");
    assert!(raw.to_ascii_lowercase().contains("cookie: analytics_consent=accepted"));
    assert!(raw.ends_with("{}"), "Empty object body: {raw}");
}

#[tokio::test]
async fn test_skipped_session_is_missing_id() {
    let (config, _request) =
        one_shot_endpoint("200 OK", r#"{"status":"skipped","reason":"no_consent"}"#).await;
    let client = HttpIngestClient::new(&config);

    let err = client.create_session().await.unwrap_err();
    assert!(matches!(err, TrackerError::MissingSessionId), "{err}");
}

#[tokio::test]
async fn test_cookie_name_is_fixed_whatever_the_storage_key() {
    let (config, request) = one_shot_endpoint("200 OK", r#"{"status":"ok","session_id":"e5f6"}"#).await;
    let config = TrackerConfig {
        consent_key: "site_consent".to_string(),
        ..config
    };
    let client = HttpIngestClient::new(&config);

    assert_eq!(client.create_session().await.unwrap(), "e5f6");

    let raw = request.await.unwrap().to_ascii_lowercase();
    assert!(raw.contains("cookie: analytics_consent=accepted"), "{raw}");
    assert!(!raw.contains("site_consent"), "{raw}");
}

/// Feed a failed create-session result to a consented tracker and check nothing is stored.
fn assert_no_session_stored(result: Result<String, TrackerError>) {
    let page = SimulatedPage::new(Url::parse("https://trexim.com/").unwrap());
    page.grant_consent();
    let mut tracker = Tracker::new(Arc::new(page.clone()), &TrackerConfig::default(), Instant::now());

    let out = tracker.step(TrackerInput::SessionResolved(result), Instant::now());
    assert!(out.is_empty());
    assert_eq!(tracker.session_id(), None);
    assert!(page.tab().is_empty(), "No session id written on failure");
}

#[tokio::test]
async fn test_malformed_session_body_is_transport() {
    let (config, _request) = one_shot_endpoint("200 OK", "<html>oops</html>").await;
    let client = HttpIngestClient::new(&config);

    let result = client.create_session().await;
    assert!(matches!(result, Err(TrackerError::Transport(_))), "{result:?}");
    assert_no_session_stored(result);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = TrackerConfig {
        endpoint: format!("http://{addr}"),
        ..TrackerConfig::default()
    };
    let client = HttpIngestClient::new(&config);

    let result = client.create_session().await;
    assert!(matches!(result, Err(TrackerError::Transport(_))), "{result:?}");
    assert_no_session_stored(result);
}

#[tokio::test]
async fn test_server_error_is_status() {
    let (config, _request) = one_shot_endpoint("500 Internal Server Error", r#"{"status":"error"}"#).await;
    let client = HttpIngestClient::new(&config);

    let event = TrackedEvent::new(EventData::Heartbeat { seconds: 30 }, "/", None);
    let err = client.record_event(event).await.unwrap_err();
    assert!(matches!(err, TrackerError::Status(s) if s.as_u16() == 500), "{err}");
}

#[tokio::test]
async fn test_beacon_wire_shape() {
    let (config, request) = one_shot_endpoint("200 OK", r#"{"status":"ok"}"#).await;
    let client = HttpIngestClient::new(&config);

    let event = TrackedEvent::new(
        EventData::PageLeave { seconds: 45, scroll_depths: vec![25, 50] },
        "/services",
        Some("a1b2c3d4".to_string()),
    );
    client.send_beacon(event).await.unwrap();

    let raw = request.await.unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("POST /api/analytics/event "));
    assert!(head.to_ascii_lowercase().contains("content-type: text/plain;charset=utf-8"));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(body).unwrap(),
        json!({
            "type": "page_leave",
            "data": {"seconds": 45, "scroll_depths": [25, 50]},
            "path": "/services",
            "session_id": "a1b2c3d4",
        })
    );
}

#[test]
fn test_form_submit_merges_extras_under_label() {
    let mut extra = Map::new();
    extra.insert("company".to_string(), json!("Acme Freight"));
    extra.insert("request_type".to_string(), json!("demo"));
    extra.insert("form_type".to_string(), json!("spoofed"));

    let event = TrackedEvent::new(EventData::form_submit("contact", extra), "/contact", None);

    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({
            "type": "form_submit",
            "data": {"form_type": "contact", "company": "Acme Freight", "request_type": "demo"},
            "path": "/contact",
        })
    );
}

#[test]
fn test_cta_without_href_serializes_null() {
    let event = TrackedEvent::new(
        EventData::CtaClick { text: "Send".into(), category: "cta".into(), href: None },
        "/",
        Some("s".into()),
    );
    let body = serde_json::to_value(&event).unwrap();
    assert_eq!(body["data"], json!({"text": "Send", "category": "cta", "href": null}));
}
