//! Per-connection read/write loop.
//!
//! Registers the device on accept, routes inbound text frames, and
//! unregisters on every exit path so the registry never holds a closed
//! connection. Outbound frames are drained by a dedicated writer task,
//! and control frames keep flowing while a text frame is being handled,
//! so a device waiting on a slow backend still answers liveness probes.
//! Text frames run one at a time in arrival order; frames that arrive
//! mid-handling are deferred, preserving per-connection ordering.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app_state::HubState;
use crate::error::HubError;
use crate::hub::Connection;
use crate::router::RequestRouter;

/// The frame currently being handled, boxed so the loop can hold it
/// across polls.
type FrameFuture = Pin<Box<dyn Future<Output = Result<(), HubError>> + Send>>;

fn dispatch_frame(
    router: Arc<RequestRouter>,
    conn: Arc<Connection>,
    text: Utf8Bytes,
) -> FrameFuture {
    Box::pin(async move { router.handle_frame(&conn, text.as_str()).await })
}

/// Runs the loop for a single device connection until it disconnects or
/// a connection-fatal error occurs.
pub async fn run_connection(socket: WebSocket, remote_addr: SocketAddr, state: HubState) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let conn = Arc::new(Connection::new(remote_addr, outbound_tx));

    state.registry.register(Arc::clone(&conn)).await;
    let total = state.registry.len().await;
    info!(conn = %conn.id(), addr = %remote_addr, total, "device connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Dedicated writer: queued frames (broadcasts, echoes, liveness
    // pings) reach the socket even while a text frame is being handled.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut in_flight: Option<FrameFuture> = None;
    let mut deferred: VecDeque<Utf8Bytes> = VecDeque::new();

    loop {
        tokio::select! {
            // Drive the frame currently being handled to completion.
            result = async {
                match in_flight.as_mut() {
                    Some(frame) => frame.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                if let Err(error) = result {
                    warn!(conn = %conn.id(), %error, "closing connection");
                    break;
                }
            }
            // Inbound frame from the device.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if in_flight.is_some() {
                            deferred.push_back(text);
                        } else {
                            in_flight = Some(dispatch_frame(
                                Arc::clone(&state.router),
                                Arc::clone(&conn),
                                text,
                            ));
                        }
                    }
                    Some(Ok(Message::Pong(_))) => conn.note_pong(),
                    // Inbound pings are answered by the protocol layer.
                    Some(Ok(Message::Ping(_) | Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => {
                        debug!(conn = %conn.id(), %error, "receive error");
                        break;
                    }
                }
            }
        }

        if in_flight.is_none()
            && let Some(text) = deferred.pop_front()
        {
            in_flight = Some(dispatch_frame(
                Arc::clone(&state.router),
                Arc::clone(&conn),
                text,
            ));
        }
    }

    writer.abort();
    state.registry.unregister(conn.id()).await;
    let remaining = state.registry.len().await;
    info!(conn = %conn.id(), addr = %remote_addr, remaining, "device disconnected");
}
