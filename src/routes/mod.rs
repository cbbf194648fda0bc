//! Route modules for the Conversion Gateway

pub mod convert;
pub mod files;
pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::storage::URL_PREFIX;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config().storage.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/convert", convert::router())
        .nest_service(URL_PREFIX, files::service(state.artifacts().dir()))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
