//! Last-seen tracking for datagram peers.
//!
//! UDP has no connection to register, so liveness is a timestamp per
//! source address: every accepted datagram refreshes it, and a periodic
//! sweep evicts addresses that have been silent too long.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Tracked datagram peers keyed by source address.
#[derive(Debug)]
pub struct PeerTable {
    peers: RwLock<HashMap<SocketAddr, Instant>>,
}

impl PeerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Records (or refreshes) activity from `addr`.
    pub async fn mark_seen(&self, addr: SocketAddr) {
        let mut map = self.peers.write().await;
        map.insert(addr, Instant::now());
    }

    /// Removes every peer silent for longer than `max_age`, returning the
    /// evicted addresses.
    pub async fn evict_stale(&self, max_age: Duration) -> Vec<SocketAddr> {
        let now = Instant::now();
        let mut map = self.peers.write().await;
        let stale: Vec<SocketAddr> = map
            .iter()
            .filter(|(_, last_seen)| now.duration_since(**last_seen) > max_age)
            .map(|(addr, _)| *addr)
            .collect();
        for addr in &stale {
            map.remove(addr);
        }
        stale
    }

    /// Returns all currently tracked peer addresses.
    pub async fn addrs(&self) -> Vec<SocketAddr> {
        self.peers.read().await.keys().copied().collect()
    }

    /// Returns `true` if `addr` is currently tracked.
    pub async fn contains(&self, addr: SocketAddr) -> bool {
        self.peers.read().await.contains_key(&addr)
    }

    /// Returns the number of tracked peers.
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Returns `true` if no peers are tracked.
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn addr(port: u16) -> SocketAddr {
        let Ok(addr) = format!("127.0.0.1:{port}").parse() else {
            panic!("valid test address");
        };
        addr
    }

    #[tokio::test(start_paused = true)]
    async fn stale_peer_is_evicted_fresh_peer_stays() {
        let table = PeerTable::new();
        let old = addr(5001);
        let fresh = addr(5002);

        table.mark_seen(old).await;
        advance(Duration::from_secs(11)).await;
        table.mark_seen(fresh).await;
        advance(Duration::from_secs(5)).await;

        // `old` is now 16 s stale, `fresh` only 5 s.
        let evicted = table.evict_stale(Duration::from_secs(15)).await;
        assert_eq!(evicted, vec![old]);
        assert!(!table.contains(old).await);
        assert!(table.contains(fresh).await);
    }

    #[tokio::test(start_paused = true)]
    async fn peer_at_exact_timeout_is_kept() {
        let table = PeerTable::new();
        let peer = addr(5003);
        table.mark_seen(peer).await;
        advance(Duration::from_secs(15)).await;

        let evicted = table.evict_stale(Duration::from_secs(15)).await;
        assert!(evicted.is_empty());
        assert!(table.contains(peer).await);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_seen_refreshes_existing_peer() {
        let table = PeerTable::new();
        let peer = addr(5004);

        table.mark_seen(peer).await;
        advance(Duration::from_secs(10)).await;
        table.mark_seen(peer).await;
        advance(Duration::from_secs(10)).await;

        // Only 10 s since the refresh.
        let evicted = table.evict_stale(Duration::from_secs(15)).await;
        assert!(evicted.is_empty());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn empty_table_sweep_is_noop() {
        let table = PeerTable::new();
        let evicted = table.evict_stale(Duration::from_secs(15)).await;
        assert!(evicted.is_empty());
        assert!(table.is_empty().await);
    }
}
