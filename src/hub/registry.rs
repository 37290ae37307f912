//! Live-connection storage.
//!
//! [`ConnectionRegistry`] holds every currently connected device behind a
//! single [`tokio::sync::RwLock`]. Mutation happens on connect, disconnect,
//! and liveness eviction; broadcast and probing iterate a point-in-time
//! snapshot so network I/O never holds the lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{ConnId, Connection};

/// Central store for all live device connections.
///
/// # Concurrency
///
/// - Snapshots are cheap clones of the `Arc` handles; iteration over a
///   snapshot never races with register/unregister.
/// - A connection known to be closed must be unregistered promptly; stale
///   entries are a correctness bug, not a tolerated state.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection. Registering the same handle twice is a no-op.
    pub async fn register(&self, conn: Arc<Connection>) {
        let mut map = self.connections.write().await;
        map.insert(conn.id(), conn);
    }

    /// Removes a connection by id. Removing an absent id is a no-op.
    pub async fn unregister(&self, id: ConnId) {
        let mut map = self.connections.write().await;
        map.remove(&id);
    }

    /// Returns a point-in-time copy of all live connections.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        let map = self.connections.read().await;
        map.values().map(Arc::clone).collect()
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no devices are connected.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
