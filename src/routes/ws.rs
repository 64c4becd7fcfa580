//! WebSocket transport adapter.
//!
//! Upgrades `GET /ws` and hands the split socket to a connection session.
//! No query parameters and no origin check: any page may connect.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::StreamExt;
use tracing::warn;

use crate::config::SessionTiming;
use crate::services::hub::Hub;
use crate::services::session;
use crate::state::AppState;

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = Arc::clone(&state.hub);
    let timing = state.config.timing;

    ws.max_message_size(state.config.max_message_bytes)
        .on_failed_upgrade(|e| warn!(error = %e, "ws: upgrade failed"))
        .on_upgrade(move |socket| run_ws(socket, hub, timing))
}

async fn run_ws(socket: WebSocket, hub: Arc<Hub>, timing: SessionTiming) {
    let (sink, stream) = socket.split();
    session::run(hub, sink, stream, timing).await;
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
