//! Periodic liveness sweep over registered connections.
//!
//! Every sweep pings each connection in a registry snapshot and waits a
//! bounded time for the pong. Probes run concurrently; one unresponsive
//! device never delays probes to the others. Connections that fail a probe
//! are evicted immediately after the sweep.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::{Connection, ConnectionRegistry};

/// Probe-and-evict loop for WebSocket connections.
#[derive(Debug)]
pub struct LivenessMonitor {
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    probe_timeout: Duration,
}

impl LivenessMonitor {
    /// Creates a monitor sweeping `registry` every `interval`, allowing
    /// each connection `probe_timeout` to answer a ping.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            registry,
            interval,
            probe_timeout,
        }
    }

    /// Runs sweeps forever. Spawn this as a background task.
    pub async fn run(self) {
        loop {
            sleep(self.interval).await;
            self.sweep().await;
        }
    }

    /// Probes every registered connection once, evicting non-responders.
    ///
    /// Returns the number of evicted connections.
    pub async fn sweep(&self) -> usize {
        let connections = self.registry.snapshot().await;
        if connections.is_empty() {
            return 0;
        }

        let probes = connections.iter().map(|conn| self.probe(conn));
        let results = join_all(probes).await;

        let mut evicted = 0;
        for (conn, alive) in connections.iter().zip(results) {
            if alive {
                continue;
            }
            warn!(conn = %conn.id(), addr = %conn.remote_addr(),
                "liveness probe failed, evicting connection");
            self.registry.unregister(conn.id()).await;
            evicted += 1;
        }

        debug!(probed = connections.len(), evicted, "liveness sweep complete");
        evicted
    }

    /// Pings one connection and waits for its pong.
    ///
    /// A stale pong permit can make a just-died connection pass one sweep;
    /// the next sweep catches it.
    async fn probe(&self, conn: &Connection) -> bool {
        if conn.send_ping().is_err() {
            return false;
        }
        timeout(self.probe_timeout, conn.wait_pong()).await.is_ok()
    }
}
