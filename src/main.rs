//! assistant-hub server entry point.
//!
//! Starts the supervised WebSocket listener, the liveness monitor, and
//! the UDP hub with its peer sweeper. The backend callbacks wired here
//! are logging placeholders; an embedding application supplies real
//! recommender/video/persistence backends through
//! [`BackendCallbacks::builder`].

use std::sync::Arc;

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use assistant_hub::app_state::HubState;
use assistant_hub::backend::{BackendCallbacks, backend_fn};
use assistant_hub::config::HubConfig;
use assistant_hub::hub::LivenessMonitor;
use assistant_hub::server;
use assistant_hub::udp::{PeerTable, UdpHub, run_sweeper};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = HubConfig::from_env()?;
    tracing::info!(ws = %config.listen_addr, udp = %config.udp_addr, "starting assistant-hub");

    // Build hub state around the callback table
    let state = HubState::new(placeholder_callbacks());

    // Liveness monitor over the shared registry
    let monitor = LivenessMonitor::new(
        Arc::clone(&state.registry),
        config.sweep_interval(),
        config.probe_timeout(),
    );
    tokio::spawn(monitor.run());

    // UDP hub + peer sweeper
    let udp_socket = tokio::net::UdpSocket::bind(config.udp_addr).await?;
    let peers = Arc::new(PeerTable::new());
    let udp_hub = UdpHub::new(udp_socket, Arc::clone(&peers), config.udp_greet_on_activity);
    tokio::spawn(udp_hub.run());
    tokio::spawn(run_sweeper(
        peers,
        config.udp_sweep_interval(),
        config.udp_peer_timeout(),
    ));

    // Supervised WebSocket listener; never returns
    server::run_supervised(state, config.listen_addr, config.restart_backoff()).await;

    Ok(())
}

/// Stand-in callbacks for running the hub without real backends: each one
/// logs the request and echoes a minimal result.
fn placeholder_callbacks() -> BackendCallbacks {
    BackendCallbacks::builder()
        .open(backend_fn(|value| async move {
            tracing::info!(url = %value, "open requested; no browser wired");
            Ok(Value::Null)
        }))
        .video(backend_fn(|value| async move {
            tracing::info!("video keywords requested; no extractor wired");
            Ok(json!({"keywords": [], "progress": value}))
        }))
        .recommend(backend_fn(|value| async move {
            tracing::info!("recommendation requested; no recommender wired");
            Ok(json!({"widgets": [], "query": value}))
        }))
        .serp(backend_fn(|value| async move {
            tracing::info!("serp search requested; no search backend wired");
            Ok(json!({"results": [], "query": value}))
        }))
        .serper(backend_fn(|value| async move {
            tracing::info!("web search requested; no search backend wired");
            Ok(json!({"results": [], "query": value}))
        }))
        .save(backend_fn(|value| async move {
            tracing::info!(note = %value, "note save requested; no store wired");
            Ok(Value::Null)
        }))
        .build()
}
