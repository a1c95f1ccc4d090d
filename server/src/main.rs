//! Inkboard server binary.
//!
//! Boot sequence: tracing, env config, bind, serve. Configuration is
//! env-only: `PORT`, `STATIC_DIR`, `MAX_STROKES`, `MAX_POINTS_PER_STROKE`.

mod frame;
mod routes;
mod services;
mod state;

use ink::LedgerConfig;
use tracing::info;

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let limits = LedgerConfig {
        max_strokes: env_usize("MAX_STROKES", 1500),
        max_points_per_stroke: env_usize("MAX_POINTS_PER_STROKE", 15_000),
    };

    let state = state::AppState::new(limits);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind listener");
    info!(
        port,
        max_strokes = limits.max_strokes,
        max_points_per_stroke = limits.max_points_per_stroke,
        "inkboard listening"
    );
    axum::serve(listener, app).await.expect("server failed");
}
