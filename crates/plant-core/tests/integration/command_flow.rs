//! Integration Tests: Control Command Flow
//!
//! Runs a mock device server on an ephemeral port and exercises:
//! - Command bodies for each command kind
//! - Non-2xx handling and timeouts (no retry)
//! - Health check and stream locator bootstrap

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use plant_core::core::DeviceClient;
use plant_core::models::{CommandKind, ControlCommand, ServerAddress};
use plant_core::{Error, PlantConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct MockDevice {
    commands: Arc<Mutex<Vec<Value>>>,
}

impl MockDevice {
    fn received(&self) -> Vec<Value> {
        self.commands.lock().unwrap().clone()
    }
}

async fn data(State(device): State<MockDevice>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    device.commands.lock().unwrap().push(body.clone());

    match body["plant_id"].as_str() {
        Some("999") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid plant_id" })),
        ),
        Some("500") => (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Null)),
        Some("slow") => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, Json(json!({ "status": "success" })))
        }
        _ => (StatusCode::OK, Json(json!({ "status": "success" }))),
    }
}

async fn ping() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": 1718000000.5,
        "server_ip": "127.0.0.1",
        "stream_url": "http://127.0.0.1:8090/?action=stream",
    }))
}

async fn spawn_device() -> (ServerAddress, MockDevice) {
    let device = MockDevice::default();
    let app = Router::new()
        .route("/data", post(data))
        .route("/ping", get(ping))
        .with_state(device.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let address = ServerAddress::parse(&local.to_string(), 5000).unwrap();
    (address, device)
}

fn client() -> DeviceClient {
    DeviceClient::new(&PlantConfig::default()).expect("Failed to create client")
}

/// Test: each command kind reaches the device with the expected body
#[tokio::test]
async fn test_command_bodies() {
    super::init_tracing();
    let (address, device) = spawn_device().await;
    let client = client();

    for (kind, value) in [
        (CommandKind::Light, 7),
        (CommandKind::Moisture, 3),
        (CommandKind::WateringInterval, 14),
    ] {
        let command = ControlCommand::new("101", kind, value).unwrap();
        client
            .send_command(&address, &command)
            .await
            .expect("command rejected");
    }

    assert_eq!(
        device.received(),
        vec![
            json!({ "plant_id": "101", "type": "light", "value": 7 }),
            json!({ "plant_id": "101", "type": "moisture", "value": 3 }),
            json!({ "plant_id": "101", "value": 14 }),
        ]
    );
}

/// Test: a non-2xx answer is a command error carrying the server's reason
#[tokio::test]
async fn test_rejected_command() {
    let (address, device) = spawn_device().await;
    let command = ControlCommand::new("999", CommandKind::Light, 5).unwrap();

    let result = client().send_command(&address, &command).await;

    assert_eq!(
        result,
        Err(Error::Command("status 400: Invalid plant_id".to_string()))
    );
    assert_eq!(device.received().len(), 1, "failed command must not be retried");
}

/// Test: without a body reason the status text is used
#[tokio::test]
async fn test_server_error_uses_status_text() {
    let (address, _device) = spawn_device().await;
    let command = ControlCommand::new("500", CommandKind::Moisture, 5).unwrap();

    let result = client().send_command(&address, &command).await;
    assert_eq!(
        result,
        Err(Error::Command("status 500: Internal Server Error".to_string()))
    );
}

/// Test: a slow device times out once
#[tokio::test]
async fn test_command_timeout() {
    let (address, device) = spawn_device().await;
    let client = client().with_timeout(Duration::from_millis(200));
    let command = ControlCommand::new("slow", CommandKind::Light, 1).unwrap();

    let err = client.send_command(&address, &command).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "unexpected error {:?}", err);
    assert!(err.is_recoverable());
    assert_eq!(device.received().len(), 1);
}

/// Test: out-of-range values never leave the client
#[tokio::test]
async fn test_out_of_range_rejected_locally() {
    assert!(matches!(
        ControlCommand::new("101", CommandKind::WateringInterval, 15),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        ControlCommand::new("101", CommandKind::Light, -1),
        Err(Error::InvalidInput(_))
    ));
}

/// Test: ping reports the stream URL used to seed the camera view
#[tokio::test]
async fn test_ping_reports_stream_url() {
    let (address, _device) = spawn_device().await;
    let client = client();

    let ping = client.ping(&address).await.expect("ping failed");
    assert_eq!(ping.status.as_deref(), Some("ok"));
    assert_eq!(ping.server_ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(
        ping.stream_url.as_deref(),
        Some("http://127.0.0.1:8090/?action=stream")
    );
    assert!(client.is_reachable(&address).await);
}

/// Test: a closed port is a network error, not a command error
#[tokio::test]
async fn test_unreachable_device() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local = listener.local_addr().unwrap();
    drop(listener);

    let address = ServerAddress::parse(&local.to_string(), 5000).unwrap();
    let command = ControlCommand::new("101", CommandKind::Light, 5).unwrap();

    let err = client().send_command(&address, &command).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "unexpected error {:?}", err);
    assert!(!client().is_reachable(&address).await);
}
