//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One websocket endpoint carries the whole drawing protocol; everything else
//! is a health check and the static client bundle served from `STATIC_DIR`.

pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Directory the static client bundle is served from.
fn static_dir() -> String {
    std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_owned())
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_service = ServeDir::new(static_dir()).append_index_html_on_directories(true);

    Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .fallback_service(static_service)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
