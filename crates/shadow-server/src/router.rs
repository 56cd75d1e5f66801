use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all `/api/v1` endpoints.
///
/// Unknown paths, and known paths hit with the wrong method, get the
/// `{"status":404,...}` body.
pub fn build_router(state: AppState, compression: bool) -> Router {
    let api = Router::new()
        .route("/removeEntry", get(handler::remove_entry).fallback(handler::not_found))
        .route("/addItem", post(handler::add_item).fallback(handler::not_found))
        .route("/removeItem", get(handler::remove_item).fallback(handler::not_found))
        .route("/getIndexes", get(handler::get_indexes).fallback(handler::not_found))
        .route("/getEntry", get(handler::get_entry).fallback(handler::not_found))
        .route("/health", get(handler::health).fallback(handler::not_found));

    let router = Router::new()
        .nest("/api/v1", api)
        .fallback(handler::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if compression {
        router.layer(CompressionLayer::new())
    } else {
        router
    }
}
