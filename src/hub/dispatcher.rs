//! Broadcast fan-out to connected devices.
//!
//! [`Dispatcher`] serializes a payload once and delivers it to every
//! connection in a registry snapshot. A failed send never aborts delivery
//! to the remaining devices; the offending connection is unregistered
//! after the pass.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::ConnectionRegistry;

/// Delivers payloads to every registered connection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns a reference to the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Serializes `envelope` and broadcasts it to all connections.
    ///
    /// A serialization failure is logged and the broadcast is skipped; the
    /// hub's own envelope types cannot fail to serialize.
    pub async fn broadcast<T: Serialize>(&self, envelope: &T) {
        match serde_json::to_string(envelope) {
            Ok(json) => self.broadcast_text(&json).await,
            Err(error) => warn!(%error, "failed to serialize broadcast envelope"),
        }
    }

    /// Broadcasts a pre-serialized payload verbatim to all connections.
    ///
    /// Broadcasting to an empty registry is a no-op. Connections whose send
    /// fails are removed from the registry after the delivery pass.
    pub async fn broadcast_text(&self, payload: &str) {
        let connections = self.registry.snapshot().await;
        if connections.is_empty() {
            return;
        }

        let mut failed = Vec::new();
        for conn in &connections {
            if let Err(error) = conn.send_text(payload.to_string()) {
                warn!(conn = %conn.id(), addr = %conn.remote_addr(), %error,
                    "dropping unreachable connection from broadcast");
                failed.push(conn.id());
            }
        }

        debug!(recipients = connections.len() - failed.len(), "broadcast delivered");

        for id in failed {
            self.registry.unregister(id).await;
        }
    }
}
