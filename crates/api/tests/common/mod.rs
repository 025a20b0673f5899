//! Shared harness for the HTTP integration tests.
//!
//! Each [`TestApp`] owns a temporary data directory holding a generated chip
//! tracker. Requests go straight to the router through
//! `tower::ServiceExt::oneshot`, without a TCP listener.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use chiplabel_api::config::ServerConfig;
use chiplabel_api::router::build_app_router;
use chiplabel_api::state::AppState;
use chiplabel_events::EventBus;
use chiplabel_queue::QueueConfig;

/// A 200 m square chip in UTM zone 19N, west edge shifted by `index` chips.
pub fn bbox(index: usize) -> String {
    let west = 268_000 + 200 * index;
    let east = west + 200;
    format!(
        "[({west}.0, 4681000.0), ({east}.0, 4681000.0), ({east}.0, 4681200.0), ({west}.0, 4681200.0)]"
    )
}

/// Tracker CSV with one well-formed row per status.
pub fn tracker_csv(statuses: &[&str]) -> String {
    let mut csv = String::from("id,bbox,status\n");
    for (i, status) in statuses.iter().enumerate() {
        csv.push_str(&format!("{},\"{}\",{status}\n", i + 1, bbox(i)));
    }
    csv
}

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
}

impl TestApp {
    /// App over a tracker with one chip per status.
    pub fn new(statuses: &[&str]) -> Self {
        Self::with_tracker(&tracker_csv(statuses))
    }

    /// App over raw tracker contents.
    pub fn with_tracker(csv: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("chip_tracker.csv"), csv).unwrap();
        let state = AppState::new(test_config(&dir), Arc::new(EventBus::default()));
        Self { dir, state }
    }

    /// App whose tracker file does not exist.
    pub fn without_tracker() -> Self {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir), Arc::new(EventBus::default()));
        Self { dir, state }
    }

    /// A fresh router over the shared state; the same middleware stack as
    /// production.
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone()).unwrap()
    }

    pub fn tracker(&self) -> String {
        fs::read_to_string(self.dir.path().join("chip_tracker.csv")).unwrap()
    }

    /// Status column of the tracker row for `id`.
    pub fn status_of(&self, id: usize) -> String {
        let prefix = format!("{id},");
        let line = self
            .tracker()
            .lines()
            .find(|line| line.starts_with(&prefix))
            .unwrap_or_else(|| panic!("no tracker row for chip {id}"))
            .to_string();
        line.rsplit(',').next().unwrap().to_string()
    }

    pub fn label_path(&self, id: usize) -> PathBuf {
        self.dir
            .path()
            .join("outputs")
            .join(format!("{id}_labels.geojson"))
    }
}

/// Build a test `ServerConfig` rooted at `dir`.
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        queue: QueueConfig::new(dir.path()),
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
