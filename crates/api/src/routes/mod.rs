pub mod chips;
pub mod health;
pub mod session;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                          WebSocket session event stream
///
/// /session                     session snapshot (GET)
/// /session/start               start labeling (POST)
/// /session/exit                release the chip and end (POST)
/// /session/view                map view (GET, PUT)
///
/// /chips/next                  fetch next chip (POST)
/// /chips/previous              go back one chip (POST)
/// /chips/summary               status counts (GET)
/// /chips/current/labels        saved labels (GET), submit (POST), delete (DELETE)
/// /chips/current/tiles         prefetch URLs (GET)
///
/// /layers                      imagery tile layers (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(session::router())
        .merge(chips::router())
}
