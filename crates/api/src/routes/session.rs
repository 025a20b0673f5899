//! Route definitions for the labeling session.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// ```text
/// GET    /session              get_session
/// POST   /session/start        start_session
/// POST   /session/exit         exit_session
/// GET    /session/view         get_view
/// PUT    /session/view         update_view
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::get_session))
        .route("/session/start", post(session::start_session))
        .route("/session/exit", post(session::exit_session))
        .route(
            "/session/view",
            get(session::get_view).put(session::update_view),
        )
}
