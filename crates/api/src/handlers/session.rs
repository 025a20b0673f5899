//! Handlers for the labeling session lifecycle and the map view.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use chiplabel_core::types::ChipId;
use chiplabel_queue::{FetchOutcome, LatLon, SessionSnapshot};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Request / response bodies
   -------------------------------------------------------------------------- */

/// Body of `PUT /session/view`.
#[derive(Debug, Deserialize, Validate)]
pub struct ViewUpdate {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[validate(range(max = 30))]
    pub zoom: u8,
}

#[derive(Debug, Serialize)]
pub struct SessionStarted {
    pub session: SessionSnapshot,
    pub fetch: FetchOutcome,
}

#[derive(Debug, Serialize)]
pub struct SessionEnded {
    pub released: Option<ChipId>,
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.run_queue(|queue| Ok(queue.snapshot())).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /session/start
///
/// Release chips left active by an earlier run and fetch the first chip.
pub async fn start_session(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let started = state
        .run_queue(|queue| {
            let fetch = queue.start()?;
            Ok(SessionStarted {
                session: queue.snapshot(),
                fetch,
            })
        })
        .await?;
    Ok(Json(DataResponse { data: started }))
}

/// POST /session/exit
pub async fn exit_session(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let released = state.run_queue(|queue| Ok(queue.exit()?)).await?;
    Ok(Json(DataResponse {
        data: SessionEnded { released },
    }))
}

/// GET /session/view
pub async fn get_view(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let view = state.run_queue(|queue| Ok(queue.view())).await?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /session/view
pub async fn update_view(
    State(state): State<AppState>,
    Json(input): Json<ViewUpdate>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let center = LatLon {
        lat: input.lat,
        lon: input.lon,
    };
    let view = state
        .run_queue(move |queue| Ok(queue.set_view(center, input.zoom)?))
        .await?;
    Ok(Json(DataResponse { data: view }))
}
