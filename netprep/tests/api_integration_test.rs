//! Integration tests for the tutor API server
//!
//! Each test boots a real `ApiServer` wired against a local mock of the
//! generative endpoint, then drives it over HTTP with reqwest.

use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

use netprep::api::server::{ApiServer, ApiServerConfig};
use netprep_tutor::{TutorConfig, TutorPipeline};

/// What the mock generative endpoint should answer with
#[derive(Clone)]
enum MockReply {
    /// Successful generation carrying this raw model text
    Text(&'static str),
    /// Error status with a standard error envelope
    Failure(u16),
    /// Server-sent events, one `data:` chunk per entry
    Sse(&'static [&'static str]),
}

async fn mock_generate(
    axum::extract::State(reply): axum::extract::State<MockReply>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    match reply {
        MockReply::Text(text) => axum::Json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
        MockReply::Failure(code) => (
            axum::http::StatusCode::from_u16(code).unwrap(),
            axum::Json(json!({
                "error": { "code": code, "message": "mock upstream failure", "status": "UNAVAILABLE" }
            })),
        )
            .into_response(),
        MockReply::Sse(chunks) => {
            let mut body = String::new();
            for (i, text) in chunks.iter().enumerate() {
                let finish = if i + 1 == chunks.len() { json!("STOP") } else { json!(null) };
                let payload = json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": text }] },
                        "finishReason": finish
                    }]
                });
                body.push_str(&format!("data: {}\n\n", payload));
            }
            (
                [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                body,
            )
                .into_response()
        }
    }
}

/// Start a mock generative endpoint and return its base URL
async fn start_mock_upstream(reply: MockReply) -> String {
    let app = axum::Router::new()
        .route("/models/:call", axum::routing::post(mock_generate))
        .with_state(reply);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr)
}

/// Test helper to start the API server in the background
async fn start_test_server(port: u16, upstream: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let tutor_config = TutorConfig::new("test-api-key")
            .with_base_url(upstream)
            .with_request_timeout(Duration::from_secs(2));
        let pipeline = TutorPipeline::new(tutor_config).unwrap();

        let config = ApiServerConfig {
            host: "127.0.0.1".to_string(),
            port,
        };

        let server = ApiServer::new(config).with_pipeline(pipeline);
        let _ = server.start().await;
    })
}

const CARD_TEXT: &str = r#"{
  "title": "OSPF Areas",
  "simpleExplanation": "OSPF areas split a large routing domain into smaller pieces so each router keeps a smaller link-state database.",
  "realWorldExample": "A campus network places each building in its own area and connects them through area 0.",
  "keyCommands": ["router ospf 1", "network 10.0.0.0 0.255.255.255 area 0"],
  "commonMistakes": ["Designing areas that do not touch area 0"],
  "quickCheck": ["What is area 0 called?"]
}"#;

#[tokio::test]
async fn test_health_check() {
    let upstream = start_mock_upstream(MockReply::Text(CARD_TEXT)).await;
    let port = 8091;

    // Start server
    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    // Test health check endpoint
    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_explain_returns_card_and_caches() {
    let upstream = start_mock_upstream(MockReply::Text(CARD_TEXT)).await;
    let port = 8092;

    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let url = format!("http://127.0.0.1:{}/api/tutor", port);

    // First request generates
    let response = client
        .post(&url)
        .json(&json!({ "concept": "OSPF areas" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["cached"], false);
    assert_eq!(body["card"]["title"], "OSPF Areas");
    assert!(body["card"]["simpleExplanation"]
        .as_str()
        .unwrap()
        .contains("link-state database"));
    assert_eq!(body["card"]["keyCommands"][0], "router ospf 1");

    // Second identical request is served from cache
    let response = client
        .post(&url)
        .json(&json!({ "concept": "OSPF areas" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cached_body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(cached_body["cached"], true);
    assert_eq!(cached_body["card"], body["card"]);
}

#[tokio::test]
async fn test_explain_empty_concept_is_bad_request() {
    let upstream = start_mock_upstream(MockReply::Text(CARD_TEXT)).await;
    let port = 8093;

    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/api/tutor", port))
        .json(&json!({ "concept": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("concept"));
}

#[tokio::test]
async fn test_upstream_failure_maps_to_bad_gateway() {
    let upstream = start_mock_upstream(MockReply::Failure(503)).await;
    let port = 8094;

    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/api/tutor", port))
        .json(&json!({ "concept": "VLAN trunking" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_stream_endpoint_emits_deltas_and_card() {
    let chunks: &[&str] = &[
        "{\"title\": \"OSPF Areas\", \"simpleExplanation\": \"OSPF areas split ",
        "a large routing domain into smaller link-state databases.\"}",
    ];
    let upstream = start_mock_upstream(MockReply::Sse(chunks)).await;
    let port = 8095;

    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/api/tutor/stream", port))
        .json(&json!({ "concept": "OSPF areas" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    // The stream is finite: deltas, one card, then the body ends
    let body = response.text().await.unwrap();
    assert!(body.contains("event: delta"));
    assert!(body.contains("event: card"));
    assert!(body.contains("OSPF Areas"));
    assert!(!body.contains("event: error"));
}

#[tokio::test]
async fn test_stream_empty_concept_is_bad_request() {
    let upstream = start_mock_upstream(MockReply::Text(CARD_TEXT)).await;
    let port = 8096;

    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/api/tutor/stream", port))
        .json(&json!({ "concept": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_survives_crlf_in_delta_text() {
    // Command output pasted by the model often carries CRLF line endings
    let chunks: &[&str] = &["interface GigabitEthernet0/1\r\n switchport mode access"];
    let upstream = start_mock_upstream(MockReply::Sse(chunks)).await;
    let port = 8097;

    let _server_handle = start_test_server(port, upstream).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/api/tutor/stream", port))
        .json(&json!({ "concept": "switchport configuration" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    // The body must complete and carry both config lines as delta data
    let body = response.text().await.unwrap();
    assert!(body.contains("event: delta"));
    assert!(body.contains("interface GigabitEthernet0/1"));
    assert!(body.contains("switchport mode access"));
    assert!(body.contains("event: card"));
    assert!(!body.contains("event: error"));
}
