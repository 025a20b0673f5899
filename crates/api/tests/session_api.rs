//! HTTP-level integration tests for the labeling session and chip queue
//! endpoints.

mod common;

use std::fs;

use axum::http::StatusCode;
use common::{body_json, delete, get, post, post_json, put_json, TestApp};
use serde_json::{json, Value};

/// Start a session and return the response `data`.
async fn start(app: &TestApp) -> Value {
    let response = post(app.router(), "/api/v1/session/start").await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

/// A drawing holding the active chip's own outline (display CRS).
async fn chip_outline(app: &TestApp) -> Value {
    let session = body_json(get(app.router(), "/api/v1/session").await).await;
    let geometry = session["data"]["current"]["geometry"].clone();
    assert_eq!(geometry["type"], "Polygon", "no active chip: {session}");
    json!({
        "type": "FeatureCollection",
        "features": [{ "type": "Feature", "properties": {}, "geometry": geometry }],
    })
}

async fn submit_outline(app: &TestApp) -> Value {
    let drawing = chip_outline(app).await;
    let response = post_json(app.router(), "/api/v1/chips/current/labels", drawing).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_session_activates_first_pending_chip() {
    let app = TestApp::new(&["labeled", "pending", "pending"]);

    let data = start(&app).await;

    assert_eq!(data["fetch"]["outcome"], "activated");
    assert_eq!(data["fetch"]["chip"]["id"], "2");
    assert_eq!(data["session"]["current"]["id"], "2");
    assert_eq!(data["session"]["can_go_back"], false);
    assert_eq!(data["session"]["view"]["zoom"], 20);
    assert_eq!(app.status_of(2), "active");
}

#[tokio::test]
async fn start_session_releases_stale_active_chips() {
    let app = TestApp::new(&["pending", "active"]);

    let data = start(&app).await;

    assert_eq!(data["fetch"]["chip"]["id"], "1");
    assert_eq!(app.status_of(1), "active");
    assert_eq!(app.status_of(2), "pending");
}

#[tokio::test]
async fn exit_session_releases_current_chip() {
    let app = TestApp::new(&["pending", "pending"]);
    start(&app).await;

    let response = post(app.router(), "/api/v1/session/exit").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["data"]["released"], "1");
    assert_eq!(app.status_of(1), "pending");

    let session = body_json(get(app.router(), "/api/v1/session").await).await;
    assert!(session["data"]["current"].is_null());
}

#[tokio::test]
async fn start_with_malformed_bbox_is_data_integrity_error() {
    let csv = "id,bbox,status\n1,\"[(268000.0, 4681000.0), (268200.0,\",pending\n";
    let app = TestApp::with_tracker(csv);

    let response = post(app.router(), "/api/v1/session/start").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "DATA_INTEGRITY");
    assert!(json["error"].as_str().unwrap().contains("chip 1"));

    assert_eq!(app.tracker(), csv, "tracker must not be written");
}

// ---------------------------------------------------------------------------
// Fetch / submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_next_is_idempotent() {
    let app = TestApp::new(&["pending", "pending"]);

    let first = body_json(post(app.router(), "/api/v1/chips/next").await).await;
    assert_eq!(first["data"]["outcome"], "activated");

    let second = body_json(post(app.router(), "/api/v1/chips/next").await).await;
    assert_eq!(second["data"]["outcome"], "unchanged");
    assert_eq!(second["data"]["chip"]["id"], "1");
    assert_eq!(app.status_of(2), "pending");
}

#[tokio::test]
async fn fetch_next_on_empty_queue() {
    let app = TestApp::new(&["labeled"]);

    let response = post(app.router(), "/api/v1/chips/next").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["outcome"], "queue_empty");
}

#[tokio::test]
async fn submit_labels_saves_and_advances() {
    let app = TestApp::new(&["pending", "pending"]);
    start(&app).await;

    let data = submit_outline(&app).await;

    assert_eq!(data["outcome"], "submitted");
    assert_eq!(data["chip_id"], "1");
    assert_eq!(data["label_count"], 1);
    assert_eq!(data["next"]["outcome"], "activated");
    assert_eq!(data["next"]["chip"]["id"], "2");
    assert_eq!(app.status_of(1), "labeled");
    assert_eq!(app.status_of(2), "active");

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(app.label_path(1)).unwrap()).unwrap();
    assert_eq!(saved["type"], "FeatureCollection");
    assert_eq!(saved["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::6348");
    assert_eq!(saved["features"][0]["properties"]["chip_id"], 1);
}

#[tokio::test]
async fn submit_drawing_in_wgs84() {
    let app = TestApp::new(&["pending"]);
    let data = start(&app).await;
    let bounds = &data["fetch"]["chip"]["bounds"];
    let (w, s) = (bounds["min_x"].as_f64().unwrap(), bounds["min_y"].as_f64().unwrap());
    let (e, n) = (bounds["max_x"].as_f64().unwrap(), bounds["max_y"].as_f64().unwrap());

    let drawing = json!({
        "type": "Polygon",
        "coordinates": [[[w, s], [e, s], [e, n], [w, n], [w, s]]],
    });
    let response = post_json(app.router(), "/api/v1/chips/current/labels?crs=4326", drawing).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["outcome"], "submitted");

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(app.label_path(1)).unwrap()).unwrap();
    let x = saved["features"][0]["geometry"]["coordinates"][0][0][0]
        .as_f64()
        .unwrap();
    assert!(x > 267_000.0 && x < 269_000.0, "stored x {x} not in UTM metres");
}

#[tokio::test]
async fn submit_empty_drawing_is_noop() {
    let app = TestApp::new(&["pending"]);
    start(&app).await;

    let drawing = json!({ "type": "FeatureCollection", "features": [] });
    let response = post_json(app.router(), "/api/v1/chips/current/labels", drawing).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["outcome"], "no_geometry");
    assert_eq!(app.status_of(1), "active");
    assert!(!app.label_path(1).exists());
}

#[tokio::test]
async fn submit_without_active_chip_is_noop() {
    let app = TestApp::new(&["labeled"]);

    let drawing = json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
    });
    let response = post_json(app.router(), "/api/v1/chips/current/labels", drawing).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["outcome"], "no_active_chip");
}

#[tokio::test]
async fn submit_invalid_geojson_returns_400() {
    let app = TestApp::new(&["pending"]);
    start(&app).await;

    let response = post_json(
        app.router(),
        "/api/v1/chips/current/labels",
        json!({ "features": [] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn submit_with_unsupported_crs_returns_400() {
    let app = TestApp::new(&["pending"]);
    start(&app).await;
    let drawing = chip_outline(&app).await;

    let response =
        post_json(app.router(), "/api/v1/chips/current/labels?crs=2249", drawing).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.status_of(1), "active");
}

// ---------------------------------------------------------------------------
// Go back / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn go_back_restores_previous_chip_once() {
    let app = TestApp::new(&["pending", "pending", "pending"]);
    start(&app).await;
    submit_outline(&app).await;

    let response = post(app.router(), "/api/v1/chips/previous").await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();

    assert_eq!(data["outcome"], "restored");
    assert_eq!(data["chip"]["id"], "1");
    assert_eq!(data["released"], "2");
    assert_eq!(data["labels_deleted"], true);
    assert_eq!(app.status_of(1), "active");
    assert_eq!(app.status_of(2), "pending");
    assert!(!app.label_path(1).exists());

    let tracker = app.tracker();
    let again = body_json(post(app.router(), "/api/v1/chips/previous").await).await;
    assert_eq!(again["data"]["outcome"], "no_history");
    assert_eq!(app.tracker(), tracker);
}

#[tokio::test]
async fn delete_labels_twice() {
    let app = TestApp::new(&["pending"]);
    start(&app).await;
    fs::create_dir_all(app.label_path(1).parent().unwrap()).unwrap();
    fs::write(app.label_path(1), r#"{"type":"FeatureCollection","features":[]}"#).unwrap();

    let first = body_json(delete(app.router(), "/api/v1/chips/current/labels").await).await;
    assert_eq!(first["data"]["outcome"], "deleted");
    assert_eq!(first["data"]["chip_id"], "1");
    assert!(!app.label_path(1).exists());

    let second = body_json(delete(app.router(), "/api/v1/chips/current/labels").await).await;
    assert_eq!(second["data"]["outcome"], "nothing_to_delete");
    assert_eq!(app.status_of(1), "active");
}

#[tokio::test]
async fn get_labels_of_current_chip() {
    let app = TestApp::new(&["pending"]);
    start(&app).await;

    let json = body_json(get(app.router(), "/api/v1/chips/current/labels").await).await;
    assert_eq!(json["data"]["chip_id"], "1");
    assert!(json["data"]["labels"].is_null());
}

// ---------------------------------------------------------------------------
// Summary, view, tiles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_counts_statuses() {
    let app = TestApp::new(&["labeled", "pending", "pending"]);
    start(&app).await;

    let json = body_json(get(app.router(), "/api/v1/chips/summary").await).await;
    assert_eq!(json["data"]["labeled"], 1);
    assert_eq!(json["data"]["active"], 1);
    assert_eq!(json["data"]["pending"], 1);
    assert_eq!(json["data"]["total"], 3);
}

#[tokio::test]
async fn view_defaults_to_configured_center() {
    let app = TestApp::new(&["pending"]);

    let json = body_json(get(app.router(), "/api/v1/session/view").await).await;
    assert_eq!(json["data"]["center"]["lat"], 42.251504);
    assert_eq!(json["data"]["center"]["lon"], -71.823585);
    assert_eq!(json["data"]["zoom"], 20);
}

#[tokio::test]
async fn update_view() {
    let app = TestApp::new(&["pending"]);

    let response = put_json(
        app.router(),
        "/api/v1/session/view",
        json!({ "lat": 42.3, "lon": -71.9, "zoom": 18 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(app.router(), "/api/v1/session/view").await).await;
    assert_eq!(json["data"]["center"]["lat"], 42.3);
    assert_eq!(json["data"]["zoom"], 18);
}

#[tokio::test]
async fn update_view_rejects_out_of_range() {
    let app = TestApp::new(&["pending"]);

    let response = put_json(
        app.router(),
        "/api/v1/session/view",
        json!({ "lat": 95.0, "lon": -71.9, "zoom": 18 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    let response = put_json(
        app.router(),
        "/api/v1/session/view",
        json!({ "lat": 42.0, "lon": -71.9, "zoom": 31 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tile_layers_one_per_year() {
    let app = TestApp::new(&["pending"]);

    let json = body_json(get(app.router(), "/api/v1/layers").await).await;
    let layers = json["data"].as_array().unwrap();
    assert_eq!(layers.len(), 3);
    assert_eq!(layers[0]["name"], "2019 Orthos");
    assert_eq!(layers[2]["name"], "2023 Orthos");
    assert_eq!(layers[0]["attribution"], "MassGIS");
}

#[tokio::test]
async fn prefetch_tiles_cover_active_chip() {
    let app = TestApp::new(&["pending"]);

    let before = body_json(get(app.router(), "/api/v1/chips/current/tiles").await).await;
    assert!(before["data"]["urls"].as_array().unwrap().is_empty());
    assert!(before["data"]["chip_id"].is_null());

    start(&app).await;
    let after = body_json(get(app.router(), "/api/v1/chips/current/tiles").await).await;
    let urls = after["data"]["urls"].as_array().unwrap();
    assert_eq!(after["data"]["zoom"], 21);
    assert_eq!(after["data"]["chip_id"], "1");
    assert!(!urls.is_empty());
    assert!(urls
        .iter()
        .all(|u| u.as_str().unwrap().contains("/tiles/21/")));
}

// ---------------------------------------------------------------------------
// Queue execution
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "current_thread")]
async fn queue_operations_run_off_the_async_thread() {
    let app = TestApp::new(&["pending", "pending"]);

    start(&app).await;
    let data = submit_outline(&app).await;

    assert_eq!(data["outcome"], "submitted");
    assert_eq!(app.status_of(2), "active");
}

#[tokio::test]
async fn poisoned_queue_lock_returns_500() {
    let app = TestApp::new(&["pending"]);
    let queue = std::sync::Arc::clone(&app.state.queue);
    let _ = std::thread::spawn(move || {
        let _guard = queue.lock().unwrap();
        panic!("poison the queue lock");
    })
    .join();

    let response = get(app.router(), "/api/v1/session").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
