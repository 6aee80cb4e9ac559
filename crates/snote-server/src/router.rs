use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all snote endpoints.
pub fn build_router(state: AppState, upload_limit: usize) -> Router {
    Router::new()
        .route("/", get(handler::index_handler))
        .route("/:note_id", get(handler::html_note_handler))
        .route("/api/health", get(handler::health_handler))
        .route("/api/gc", post(handler::trigger_gc_handler))
        .route("/api/note", post(handler::create_note_handler))
        .route(
            "/api/note/:note_id",
            get(handler::get_note_handler)
                .put(handler::put_note_handler)
                .delete(handler::delete_note_handler),
        )
        .route("/api/blob", post(handler::upload_blob_handler))
        .route("/api/blob/:blob_id", get(handler::get_bare_blob_handler))
        .route(
            "/api/blob/:blob_id/:filename",
            get(handler::get_blob_handler),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
