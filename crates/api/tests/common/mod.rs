//! Common test utilities for integration tests.
//!
//! Builds the router around in-memory record storage and a scripted location
//! source, so the tests need no database or position provider.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use domain::models::{NewDeviceRecord, Position};
use domain::services::{DeviceRecordStore, ScriptedLocationSource, SessionState};
use persistence::InMemoryDeviceRecords;
use share_location_api::{
    app::create_app,
    config::Config,
    services::{SharingController, SharingDeps, SharingSettings},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const KITCHEN: Position = Position {
    latitude: 13.7563,
    longitude: 100.5018,
};

const TEST_CONFIG: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 8080
    request_timeout_secs = 30

    [logging]
    level = "debug"
    format = "compact"

    [sharing]
    sampling_interval_ms = 60000
    stop_grace_ms = 1000

    [device]
    device_type = "android"

    [identity]
    path = "data/test-storage.json"

    [location]
    provider = "fixed"
    latitude = 13.7563
    longitude = 100.5018

    [records]
    backend = "memory"

    [database]
    url = ""
"#;

/// Test configuration using in-memory records.
pub fn test_config() -> Config {
    config::Config::builder()
        .add_source(config::File::from_str(TEST_CONFIG, config::FileFormat::Toml))
        .build()
        .expect("Failed to build test config")
        .try_deserialize()
        .expect("Failed to deserialize test config")
}

pub struct TestApp {
    pub router: Router,
    pub controller: SharingController,
    pub records: Arc<InMemoryDeviceRecords>,
    pub location: Arc<ScriptedLocationSource>,
    pub device_id: Uuid,
}

/// Spawn the app with empty storage and a location source fixed at [`KITCHEN`].
pub fn spawn_app() -> TestApp {
    spawn_app_with(
        InMemoryDeviceRecords::new(),
        ScriptedLocationSource::fixed(KITCHEN),
        Uuid::new_v4(),
    )
}

pub fn spawn_app_with(
    records: InMemoryDeviceRecords,
    location: ScriptedLocationSource,
    device_id: Uuid,
) -> TestApp {
    let config = test_config();
    let records = Arc::new(records);
    let location = Arc::new(location);

    let (controller, _task) = SharingController::spawn(
        SessionState::new(device_id, config.device.device_type.clone()),
        SharingDeps {
            records: records.clone(),
            location: location.clone(),
        },
        SharingSettings {
            sampling_interval: Duration::from_millis(config.sharing.sampling_interval_ms),
            stop_grace: Duration::from_millis(config.sharing.stop_grace_ms),
        },
    );

    TestApp {
        router: create_app(config, controller.clone()),
        controller,
        records,
        location,
        device_id,
    }
}

/// Insert a record owned by `device_id`.
pub async fn seed_record(
    records: &InMemoryDeviceRecords,
    device_id: Uuid,
    device_name: &str,
    is_active: bool,
) -> i64 {
    records
        .insert(NewDeviceRecord {
            device_id,
            device_name: device_name.to_string(),
            device_type: "ios".to_string(),
            latitude: 1.0,
            longitude: 1.0,
            is_active,
        })
        .await
        .expect("Failed to seed record")
        .id
}

/// Send a request and parse the JSON response body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A request carrying `body` verbatim under a JSON content type.
pub fn raw_json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
