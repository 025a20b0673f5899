//! Handlers for the chip work queue: fetch, submit, delete, go back, and
//! the imagery tiles around the active chip.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use chiplabel_core::crs::Crs;
use chiplabel_core::types::ChipId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters of `POST /chips/current/labels`.
#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    /// EPSG code the polygons were drawn in. Defaults to the display CRS.
    pub crs: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChipLabels {
    pub chip_id: Option<ChipId>,
    pub labels: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct PrefetchTiles {
    pub chip_id: Option<ChipId>,
    pub zoom: u8,
    pub urls: Vec<String>,
}

/// POST /chips/next
pub async fn fetch_next(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let outcome = state.run_queue(|queue| Ok(queue.fetch_next()?)).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /chips/current/labels
///
/// The body is the drawing as GeoJSON (FeatureCollection, Feature or bare
/// geometry). Only polygons are saved.
pub async fn submit_labels(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    Json(drawing): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let drawn_in = match params.crs {
        Some(code) => Crs::from_epsg(code)?,
        None => state.config.queue.display_crs,
    };
    let outcome = state
        .run_queue(move |queue| Ok(queue.submit_geojson(&drawing, drawn_in)?))
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /chips/current/labels
pub async fn get_labels(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let labels = state
        .run_queue(|queue| {
            Ok(ChipLabels {
                labels: queue.current_labels()?,
                chip_id: queue.current().map(|chip| chip.id.clone()),
            })
        })
        .await?;
    Ok(Json(DataResponse { data: labels }))
}

/// DELETE /chips/current/labels
pub async fn delete_labels(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let outcome = state.run_queue(|queue| Ok(queue.delete_labels()?)).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /chips/previous
pub async fn go_back(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let outcome = state.run_queue(|queue| Ok(queue.go_back()?)).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /chips/summary
pub async fn summary(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let summary = state.run_queue(|queue| Ok(queue.summary()?)).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /chips/current/tiles
///
/// Tile URLs covering the active chip for every imagery year, for the client
/// to warm its cache.
pub async fn prefetch_tiles(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let tiles = state
        .run_queue(|queue| {
            Ok(PrefetchTiles {
                urls: queue.prefetch_urls()?,
                chip_id: queue.current().map(|chip| chip.id.clone()),
                zoom: queue.config().tiles.prefetch_zoom,
            })
        })
        .await?;
    Ok(Json(DataResponse { data: tiles }))
}

/// GET /layers
pub async fn tile_layers(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let layers = state.run_queue(|queue| Ok(queue.tile_layers())).await?;
    Ok(Json(DataResponse { data: layers }))
}
