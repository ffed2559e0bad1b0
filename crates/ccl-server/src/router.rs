use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all ledger and converter endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::status_handler))
        .route(
            "/api/ledger/entries",
            get(handler::list_entries).post(handler::add_entry),
        )
        .route("/api/ledger/entry/:id", get(handler::get_entry))
        .route("/api/ledger/device/:device_id", get(handler::device_entries))
        .route("/api/ledger/verify", get(handler::verify))
        .route("/api/ledger/stats", get(handler::stats))
        .route("/api/ledger/export", get(handler::export))
        .route("/api/converter/readings", post(handler::add_reading))
        .route("/api/converter/stats", get(handler::conversion_stats))
        .route("/api/converter/device/:device_id", get(handler::device_credits))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// [`build_router`] with a permissive CORS layer on top.
pub fn build_router_with_cors(state: AppState) -> Router {
    build_router(state).layer(CorsLayer::permissive())
}
