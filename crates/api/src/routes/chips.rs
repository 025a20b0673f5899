//! Route definitions for the chip work queue and imagery layers.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chips;
use crate::state::AppState;

/// ```text
/// POST   /chips/next                   fetch_next
/// POST   /chips/previous               go_back
/// GET    /chips/summary                summary
/// GET    /chips/current/labels         get_labels
/// POST   /chips/current/labels         submit_labels (?crs)
/// DELETE /chips/current/labels         delete_labels
/// GET    /chips/current/tiles          prefetch_tiles
/// GET    /layers                       tile_layers
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chips/next", post(chips::fetch_next))
        .route("/chips/previous", post(chips::go_back))
        .route("/chips/summary", get(chips::summary))
        .route(
            "/chips/current/labels",
            get(chips::get_labels)
                .post(chips::submit_labels)
                .delete(chips::delete_labels),
        )
        .route("/chips/current/tiles", get(chips::prefetch_tiles))
        .route("/layers", get(chips::tile_layers))
}
