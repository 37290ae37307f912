//! Axum WebSocket upgrade handler.

use std::net::SocketAddr;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::HubState;

/// Upgrades an HTTP connection to WebSocket and hands it to the
/// per-connection loop. Mounted at both `/` and `/ws`: HoloLens clients
/// connect to the root path, browser clients to `/ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<HubState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, addr, state))
}
