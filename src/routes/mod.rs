//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the websocket endpoint, the location and highscore APIs and the
//! health probe under one Axum router. When `STATIC_DIR` is configured,
//! unmatched paths fall through to a static file server.

pub mod highscores;
pub mod locations;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/api/location", post(locations::record_location))
        .route("/api/locations", get(locations::list_locations))
        .route("/api/highscores", get(highscores::get_highscores))
        .route("/api/highscore", post(highscores::submit_highscore))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
