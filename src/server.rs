//! Supervised WebSocket listener.
//!
//! The listen loop is wrapped in a supervising retry: if serving crashes,
//! the error is logged and the listener restarts after a fixed backoff.
//! The hub keeps attempting to serve indefinitely rather than exiting.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::routing::any;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::app_state::HubState;
use crate::error::HubError;
use crate::ws::handler::ws_handler;

/// Builds the hub's router: the WebSocket upgrade mounted at `/` and `/ws`.
#[must_use]
pub fn build_router(state: HubState) -> Router {
    Router::new()
        .route("/", any(ws_handler))
        .route("/ws", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves forever, restarting the listener after `backoff` on any fatal
/// error. Never returns.
pub async fn run_supervised(state: HubState, addr: SocketAddr, backoff: Duration) {
    loop {
        if let Err(error) = serve_once(state.clone(), addr).await {
            error!(%error, "hub listener failed");
        }
        info!(delay_secs = backoff.as_secs(), "restarting hub listener");
        tokio::time::sleep(backoff).await;
    }
}

/// Binds the listen socket and serves until a fatal error.
///
/// # Errors
///
/// Returns [`HubError::Io`] if binding or serving fails.
async fn serve_once(state: HubState, addr: SocketAddr) -> Result<(), HubError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "hub listening");

    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::{BackendCallbacks, backend_fn};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    async fn spawn_hub_with(callbacks: BackendCallbacks) -> (SocketAddr, HubState) {
        let state = HubState::new(callbacks);

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("ephemeral bind should succeed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener should report its address");
        };

        let app = build_router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });
        (addr, state)
    }

    async fn spawn_hub() -> SocketAddr {
        let callbacks = BackendCallbacks::builder()
            .open(backend_fn(|_| async move { Ok(Value::Null) }))
            .build();
        let (addr, _state) = spawn_hub_with(callbacks).await;
        addr
    }

    #[tokio::test]
    async fn echo_round_trip_over_real_socket() {
        let addr = spawn_hub().await;

        let Ok((mut ws, _)) = connect_async(format!("ws://{addr}/")).await else {
            panic!("client should connect");
        };

        let raw = r#"{"id":"abc","type":"open","value":"http://example.com"}"#;
        let Ok(()) = ws.send(Message::text(raw)).await else {
            panic!("send should succeed");
        };

        let Some(Ok(Message::Text(reply))) = ws.next().await else {
            panic!("expected an echo frame");
        };
        let Ok(echo) = serde_json::from_str::<Value>(reply.as_str()) else {
            panic!("echo should be valid JSON");
        };
        assert_eq!(echo.get("type"), Some(&json!("echo")));
        assert_eq!(echo.get("id"), Some(&json!("abc")));
        assert_eq!(echo.get("value"), Some(&json!(raw)));
    }

    #[tokio::test]
    async fn echo_is_not_broadcast_to_other_devices() {
        let addr = spawn_hub().await;

        let Ok((mut sender, _)) = connect_async(format!("ws://{addr}/ws")).await else {
            panic!("sender should connect");
        };
        let Ok((mut other, _)) = connect_async(format!("ws://{addr}/ws")).await else {
            panic!("other device should connect");
        };

        let Ok(()) = sender
            .send(Message::text(r#"{"type":"open","value":"http://example.com"}"#))
            .await
        else {
            panic!("send should succeed");
        };

        // Sender gets its echo.
        let Some(Ok(Message::Text(_))) = sender.next().await else {
            panic!("sender should receive the echo");
        };

        // The other device hears nothing.
        let silent =
            tokio::time::timeout(Duration::from_millis(200), other.next()).await;
        assert!(silent.is_err(), "no frame should reach other devices");
    }

    #[tokio::test]
    async fn device_waiting_on_slow_backend_survives_sweep() {
        use crate::hub::LivenessMonitor;
        use std::sync::Arc;

        // Backend slower than the probe timeout, as LLM calls are.
        let callbacks = BackendCallbacks::builder()
            .video(backend_fn(|_| async move {
                tokio::time::sleep(Duration::from_millis(800)).await;
                Ok(json!({"keywords": []}))
            }))
            .build();
        let (addr, state) = spawn_hub_with(callbacks).await;
        let monitor = LivenessMonitor::new(
            Arc::clone(&state.registry),
            Duration::from_secs(10),
            Duration::from_millis(400),
        );

        let Ok((mut ws, _)) = connect_async(format!("ws://{addr}/")).await else {
            panic!("client should connect");
        };
        let Ok(()) = ws
            .send(Message::text(r#"{"id":"v1","type":"video","value":0}"#))
            .await
        else {
            panic!("send should succeed");
        };

        // The echo confirms the device is registered and its request is
        // in flight.
        let Some(Ok(Message::Text(_))) = ws.next().await else {
            panic!("expected the echo");
        };

        // Sweep mid-call while the client keeps polling (and therefore
        // answers the probe ping).
        let sweep = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            monitor.sweep().await
        };
        let await_result = async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => break text.to_string(),
                    Some(Ok(_)) => {}
                    other => panic!("connection dropped mid-call: {other:?}"),
                }
            }
        };
        let (evicted, result) = tokio::join!(sweep, await_result);

        assert_eq!(evicted, 0, "responsive device mid-request must not be evicted");
        assert_eq!(state.registry.len().await, 1);

        let Ok(frame) = serde_json::from_str::<Value>(&result) else {
            panic!("result should be valid JSON");
        };
        assert_eq!(frame.get("type"), Some(&json!("video")));
        assert_eq!(frame.get("id"), Some(&json!("v1")));
    }
}
