//! Router tests against an in-memory sink
//!
//! Frames come from a virtual device so the relay is exercised with the same
//! bytes a real people counter would send.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use imb_payload::PeopleCounterVariant;
use imb_relay::{router, AppState, Envelope, MetricsSink, RelayConfig, SinkError};
use imb_sim::{Framing, VirtualDevice};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-key";
const DEVICE_ID: [u8; 8] = [0x00, 0x04, 0xA3, 0x0B, 0x00, 0xF1, 0x2C, 0x01];

#[derive(Debug, Default)]
struct MemorySink {
    delivered: Mutex<Vec<Envelope>>,
    fail: bool,
}

impl MemorySink {
    fn delivered(&self) -> Vec<Envelope> {
        self.delivered.lock().unwrap().clone()
    }
}

impl MetricsSink for MemorySink {
    async fn deliver(&self, envelope: Envelope) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Status(503));
        }
        self.delivered.lock().unwrap().push(envelope);
        Ok(())
    }
}

fn state(api_key: Option<&str>, sink: MemorySink) -> Arc<AppState<MemorySink>> {
    let config = RelayConfig {
        api_key: api_key.map(String::from),
        ..Default::default()
    };
    Arc::new(AppState::new(config, sink))
}

fn app(state: &Arc<AppState<MemorySink>>) -> Router {
    router(Arc::clone(state))
}

fn uplink(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/uplink")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn totals_frame() -> imb_sim::SimFrame {
    let mut device = VirtualDevice::new(DEVICE_ID);
    device.record_passages(5, 7);
    device
        .frame(PeopleCounterVariant::Totals, Framing::Port)
        .unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let state = state(None, MemorySink::default());
    let response = app(&state)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "ok", "service": "imb-relay" })
    );
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_unauthorized_request() {
    let state = state(Some(API_KEY), MemorySink::default());
    let request = Request::builder()
        .method("POST")
        .uri("/uplink")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "payload": "f101", "port": 10 }).to_string()))
        .unwrap();

    let response = app(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.sink.delivered().is_empty());
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let state = state(Some(API_KEY), MemorySink::default());
    let request = Request::builder()
        .method("POST")
        .uri("/uplink")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", API_KEY))
        .body(Body::from(json!({ "payload": "f101", "port": 10 }).to_string()))
        .unwrap();

    let response = app(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Decoding and forwarding
// ============================================================================

#[tokio::test]
async fn test_simulated_frame_is_forwarded() {
    let state = state(Some(API_KEY), MemorySink::default());
    let frame = totals_frame();

    let response = app(&state)
        .oneshot(uplink(json!({
            "payload": frame.to_hex(),
            "port": frame.port,
            "device_eui": frame.device_eui_hex(),
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["payload_variant"], 7);
    assert_eq!(body["data"]["total_counter_a"], 5);
    assert_eq!(body["data"]["total_counter_b"], 7);
    assert_eq!(body["data"]["device_id"], "0004a30b00f12c01");

    let delivered = state.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].port, Some(27));
    assert_eq!(delivered[0].record.total_counter_b, Some(7));
}

#[tokio::test]
async fn test_headered_frame_without_port() {
    let state = state(Some(API_KEY), MemorySink::default());
    let mut device = VirtualDevice::new(DEVICE_ID);
    let frame = device
        .frame(PeopleCounterVariant::Status, Framing::Header)
        .unwrap();

    let response = app(&state)
        .oneshot(uplink(json!({ "payload": frame.to_hex() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let delivered = state.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].port, None);
    assert_eq!(delivered[0].record.payload_variant, 0x08);
}

#[tokio::test]
async fn test_unmapped_port_is_no_content() {
    let state = state(Some(API_KEY), MemorySink::default());

    let response = app(&state)
        .oneshot(uplink(json!({ "payload": "0100050007", "port": 99 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.sink.delivered().is_empty());
}

#[tokio::test]
async fn test_tagged_decode_error() {
    let state = state(Some(API_KEY), MemorySink::default());

    let response = app(&state)
        .oneshot(uplink(json!({ "payload": "f102", "port": 10 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await,
        json!({ "errors": ["Expected downlink response"] })
    );
    assert!(state.sink.delivered().is_empty());
}

#[tokio::test]
async fn test_sink_failure_is_bad_gateway() {
    let sink = MemorySink {
        fail: true,
        ..Default::default()
    };
    let state = state(Some(API_KEY), sink);

    let response = app(&state)
        .oneshot(uplink(json!({ "payload": "f101", "port": 10 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test]
async fn test_bad_hex_payload() {
    let state = state(Some(API_KEY), MemorySink::default());

    let response = app(&state)
        .oneshot(uplink(json!({ "payload": "zz01", "port": 27 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(state.sink.delivered().is_empty());
}

#[tokio::test]
async fn test_bad_device_eui() {
    let state = state(Some(API_KEY), MemorySink::default());

    let response = app(&state)
        .oneshot(uplink(json!({
            "payload": "0100050007",
            "port": 27,
            "device_eui": "0004a3",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_payload() {
    let state = state(Some(API_KEY), MemorySink::default());

    let response = app(&state)
        .oneshot(uplink(json!({ "port": 27 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "errors": ["missing payload"] })
    );
}

#[tokio::test]
async fn test_malformed_json_body() {
    let state = state(Some(API_KEY), MemorySink::default());
    let request = Request::builder()
        .method("POST")
        .uri("/uplink")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from("{\"payload\": "))
        .unwrap();

    let response = app(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_wrongly_typed_payload() {
    let state = state(Some(API_KEY), MemorySink::default());

    let response = app(&state)
        .oneshot(uplink(json!({ "payload": 42, "port": 27 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"][0].is_string());
    assert!(state.sink.delivered().is_empty());
}

#[tokio::test]
async fn test_missing_content_type() {
    let state = state(Some(API_KEY), MemorySink::default());
    let request = Request::builder()
        .method("POST")
        .uri("/uplink")
        .header("x-api-key", API_KEY)
        .body(Body::from(json!({ "payload": "f101", "port": 10 }).to_string()))
        .unwrap();

    let response = app(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = body_json(response).await;
    assert!(body["errors"][0].is_string());
}

#[tokio::test]
async fn test_auth_checked_before_body() {
    let state = state(Some(API_KEY), MemorySink::default());
    let request = Request::builder()
        .method("POST")
        .uri("/uplink")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = app(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
