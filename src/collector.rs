//! ==============================================================================
//! collector.rs - http endpoint that receives readings
//! ==============================================================================
//!
//! purpose:
//!     the other end of the reporter. accepts POSTed readings, appends them
//!     to a json array on disk, and serves them back.
//!
//! routes:
//!     POST /api/sensor    store one reading
//!     GET  /api/sensor    every stored reading
//!     GET  /api/temp      {"temp": ...} of the latest reading
//!     GET  /api/humidity  {"humidity": ...} of the latest reading
//!
//!     errors come back as {"error": "..."} with 400 (bad body),
//!     404 (nothing stored yet) or 500 (data file problems).
//!
//! concurrency:
//!     every route takes the store mutex for the whole read-modify-write, so
//!     concurrent posts never lose each other's readings.
//!
//! ==============================================================================

use crate::domain::SensorReading;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("data file {path} is not a reading list: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },

    #[error("failed to encode readings: {0}")]
    Encode(#[from] serde_json::Error),
}

// ==============================================================================
// storage
// ==============================================================================

/// json-array file of every reading received
///
/// a missing file reads as an empty list. the whole array is rewritten on
/// every append.
pub struct ReadingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReadingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn all(&self) -> Result<Vec<SensorReading>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    pub async fn latest(&self) -> Result<Option<SensorReading>, StoreError> {
        Ok(self.all().await?.pop())
    }

    pub async fn append(&self, reading: SensorReading) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;
        let mut readings = self.read_unlocked().await?;
        readings.push(reading);

        let encoded = serde_json::to_vec(&readings)?;
        tokio::fs::write(&self.path, encoded)
            .await
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })?;
        Ok(readings.len())
    }

    async fn read_unlocked(&self) -> Result<Vec<SensorReading>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };
        serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })
    }
}

// ==============================================================================
// web server
// ==============================================================================

#[derive(Clone)]
pub struct CollectorState {
    store: Arc<ReadingStore>,
    /// print each received reading
    echo: bool,
}

impl CollectorState {
    pub fn new(store: ReadingStore, echo: bool) -> Self {
        Self { store: Arc::new(store), echo }
    }

    /// console line for a stored reading, if echo is on
    pub fn echo_line(&self, reading: &SensorReading) -> Option<String> {
        self.echo.then(|| format!("Received Sensor Data: {}", reading))
    }
}

/// {"error": ...} with a status code
struct ApiError(StatusCode, String);

impl ApiError {
    fn read_failed(e: StoreError) -> Self {
        tracing::error!("{}", e);
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read sensor data file".into())
    }

    fn no_data() -> Self {
        ApiError(StatusCode::NOT_FOUND, "No sensor data available".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

pub fn router(state: CollectorState) -> Router {
    Router::new()
        .route("/api/sensor", get(list_handler).post(ingest_handler))
        .route("/api/temp", get(temp_handler))
        .route("/api/humidity", get(humidity_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// bind `bind_address` and serve until the process stops
pub async fn serve(bind_address: &str, state: CollectorState) -> Result<()> {
    let listener = TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("failed to bind collector on {}", bind_address))?;
    serve_on(listener, state).await
}

/// serve on an already-bound listener
pub async fn serve_on(listener: TcpListener, state: CollectorState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, file = %state.store.path().display(), "collector listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn ingest_handler(
    State(state): State<CollectorState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // the body is bound as json whatever the content-type header says
    let reading: SensorReading =
        serde_json::from_slice(&body).map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))?;

    let count = state.store.append(reading.clone()).await.map_err(|e| {
        tracing::error!("{}", e);
        let message = match e {
            StoreError::Read { .. } | StoreError::Corrupt { .. } => "Failed to read sensor data file",
            StoreError::Write { .. } | StoreError::Encode(_) => "Failed to write sensor data to file",
        };
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    })?;

    if let Some(line) = state.echo_line(&reading) {
        println!("{}", line);
    }
    tracing::debug!(stored = count, "reading stored");

    Ok(Json(json!({
        "message": "Sensor data received successfully",
        "timestamp": reading.timestamp,
    })))
}

async fn list_handler(State(state): State<CollectorState>) -> Result<Json<Vec<SensorReading>>, ApiError> {
    state.store.all().await.map(Json).map_err(ApiError::read_failed)
}

async fn temp_handler(State(state): State<CollectorState>) -> Result<Json<Value>, ApiError> {
    let latest = state.store.latest().await.map_err(ApiError::read_failed)?;
    let reading = latest.ok_or_else(ApiError::no_data)?;
    Ok(Json(json!({ "temp": reading.temperature })))
}

async fn humidity_handler(State(state): State<CollectorState>) -> Result<Json<Value>, ApiError> {
    let latest = state.store.latest().await.map_err(ApiError::read_failed)?;
    let reading = latest.ok_or_else(ApiError::no_data)?;
    Ok(Json(json!({ "humidity": reading.humidity })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::net::SocketAddr;

    fn reading(temp: f64, humidity: u32) -> SensorReading {
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            temperature: temp,
            dust: 90,
            humidity,
        }
    }

    async fn spawn_collector(dir: &tempfile::TempDir) -> SocketAddr {
        let store = ReadingStore::new(dir.path().join("sensordata.json"));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_on(listener, CollectorState::new(store, false)));
        addr
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::new(dir.path().join("none.json"));
        assert!(store.all().await.unwrap().is_empty());
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::new(dir.path().join("data.json"));

        assert_eq!(store.append(reading(21.0, 61)).await.unwrap(), 1);
        assert_eq!(store.append(reading(22.0, 62)).await.unwrap(), 2);

        let all = store.all().await.unwrap();
        assert_eq!(all, vec![reading(21.0, 61), reading(22.0, 62)]);
        assert_eq!(store.latest().await.unwrap(), Some(reading(22.0, 62)));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = ReadingStore::new(&path);
        assert!(matches!(store.all().await, Err(StoreError::Corrupt { .. })));
        assert!(matches!(store.append(reading(21.0, 61)).await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ReadingStore::new(dir.path().join("data.json")));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append(reading(20.0 + i as f64 / 10.0, 60 + i)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.all().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn post_then_query_latest_values() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn_collector(&dir).await;
        let client = reqwest::Client::new();
        let base = format!("http://{}", addr);

        for r in [reading(21.5, 65), reading(27.1, 88)] {
            let resp = client
                .post(format!("{base}/api/sensor"))
                .header("Content-Type", "application/json")
                .body(r.to_json().unwrap())
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["message"], "Sensor data received successfully");
        }

        let temp: Value = client.get(format!("{base}/api/temp")).send().await.unwrap().json().await.unwrap();
        assert_eq!(temp, json!({ "temp": 27.1 }));

        let hum: Value = client.get(format!("{base}/api/humidity")).send().await.unwrap().json().await.unwrap();
        assert_eq!(hum, json!({ "humidity": 88 }));

        let all: Vec<SensorReading> =
            client.get(format!("{base}/api/sensor")).send().await.unwrap().json().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn latest_without_data_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn_collector(&dir).await;

        let resp = reqwest::get(format!("http://{}/api/temp", addr)).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "No sensor data available");

        let list: Vec<SensorReading> =
            reqwest::get(format!("http://{}/api/sensor", addr)).await.unwrap().json().await.unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn echo_line_follows_show_sensor_data() {
        let dir = tempfile::tempdir().unwrap();
        let r = reading(23.4, 77);

        let loud = CollectorState::new(ReadingStore::new(dir.path().join("a.json")), true);
        let line = loud.echo_line(&r).unwrap();
        assert!(line.starts_with("Received Sensor Data: "), "{line}");
        for needle in ["2024-05-01T12:00:00", "23.4", "90", "77"] {
            assert!(line.contains(needle), "missing {needle} in {line}");
        }

        let quiet = CollectorState::new(ReadingStore::new(dir.path().join("b.json")), false);
        assert_eq!(quiet.echo_line(&r), None);
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn_collector(&dir).await;

        let resp = reqwest::Client::new()
            .post(format!("http://{}/api/sensor", addr))
            .header("Content-Type", "text/plain")
            .body(reading(24.0, 70).to_json().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = reqwest::Client::new()
            .post(format!("http://{}/api/sensor", addr))
            .body(reading(25.0, 71).to_json().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let all: Vec<SensorReading> =
            reqwest::get(format!("http://{}/api/sensor", addr)).await.unwrap().json().await.unwrap();
        assert_eq!(all, vec![reading(24.0, 70), reading(25.0, 71)]);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn_collector(&dir).await;

        let resp = reqwest::Client::new()
            .post(format!("http://{}/api/sensor", addr))
            .header("Content-Type", "application/json")
            .body(r#"{"timestamp": "yesterday", "temp": 1.0}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
        assert!(!dir.path().join("sensordata.json").exists());
    }
}
