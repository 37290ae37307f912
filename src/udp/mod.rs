//! Datagram transport: the same liveness pattern over UDP.
//!
//! Connectionless devices announce themselves with `"Hello Server"` and
//! keep themselves tracked with `"ping"`; anything else is ignored without
//! a reply. A companion sweeper evicts peers that have gone silent.

pub mod peers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub use peers::PeerTable;

/// Hello command sent by a device on startup.
pub const HELLO: &str = "Hello Server";
/// Reply to [`HELLO`].
pub const HELLO_REPLY: &str = "Hello from server!";
/// Liveness command sent by a device.
pub const PING: &str = "ping";
/// Reply to [`PING`].
pub const PONG: &str = "pong";
/// Greeting sent to every tracked peer when greet-on-activity is enabled.
pub const PEER_GREETING: &str = "Hello HoloLens!";

/// Datagram server: one socket, one receive loop, a shared peer table.
#[derive(Debug)]
pub struct UdpHub {
    socket: UdpSocket,
    peers: Arc<PeerTable>,
    greet_on_activity: bool,
}

impl UdpHub {
    /// Creates a hub over an already-bound `socket`.
    ///
    /// `greet_on_activity` re-greets every tracked peer after each handled
    /// datagram. It floods peers and is off in production; it exists only
    /// for debugging device discovery.
    #[must_use]
    pub fn new(socket: UdpSocket, peers: Arc<PeerTable>, greet_on_activity: bool) -> Self {
        Self {
            socket,
            peers,
            greet_on_activity,
        }
    }

    /// Receives and handles datagrams forever. Receive errors are logged
    /// and the loop continues; spawn this as a background task.
    pub async fn run(self) {
        info!(addr = ?self.socket.local_addr().ok(), "udp hub listening");
        let mut buf = [0u8; 1024];
        loop {
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(error) => {
                    warn!(%error, "udp receive failed");
                    continue;
                }
            };
            let data = buf.get(..len).unwrap_or_default();
            self.handle_datagram(data, addr).await;
        }
    }

    /// Handles one datagram: refresh the peer table and reply, or ignore.
    async fn handle_datagram(&self, data: &[u8], addr: SocketAddr) {
        let Ok(text) = std::str::from_utf8(data) else {
            debug!(%addr, "ignoring non-utf8 datagram");
            return;
        };

        match text.trim() {
            HELLO => {
                self.peers.mark_seen(addr).await;
                debug!(%addr, "peer hello");
                self.reply(HELLO_REPLY, addr).await;
            }
            PING => {
                self.peers.mark_seen(addr).await;
                self.reply(PONG, addr).await;
            }
            other => {
                debug!(%addr, command = other, "ignoring unrecognized datagram");
                return;
            }
        }

        if self.greet_on_activity {
            for peer in self.peers.addrs().await {
                self.reply(PEER_GREETING, peer).await;
            }
        }
    }

    /// Sends `message` to `addr`, logging send failures.
    async fn reply(&self, message: &str, addr: SocketAddr) {
        if let Err(error) = self.socket.send_to(message.as_bytes(), addr).await {
            warn!(%addr, %error, "udp send failed");
        }
    }
}

/// Sweeps `peers` every `interval`, evicting addresses silent for longer
/// than `max_age`. Runs forever; spawn as a background task.
pub async fn run_sweeper(peers: Arc<PeerTable>, interval: Duration, max_age: Duration) {
    loop {
        sleep(interval).await;
        for addr in peers.evict_stale(max_age).await {
            warn!(%addr, "udp peer timed out");
        }
    }
}
