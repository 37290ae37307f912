//! Handle for a single connected device.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::Notify;
use tokio::sync::mpsc;

use super::ConnId;
use crate::error::HubError;

/// An opaque handle to one connected device.
///
/// Created on accept and owned by [`super::ConnectionRegistry`] for its
/// connected lifetime. Sending goes through an unbounded channel drained
/// by the connection's write loop, so any task may send without awaiting
/// socket I/O. The pong signal is raised by the read loop whenever the
/// device answers a liveness probe.
#[derive(Debug)]
pub struct Connection {
    id: ConnId,
    remote_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Message>,
    pong: Notify,
}

impl Connection {
    /// Creates a new handle for a device at `remote_addr`, sending outbound
    /// frames through `outbound`.
    #[must_use]
    pub fn new(remote_addr: SocketAddr, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: ConnId::new(),
            remote_addr,
            outbound,
            pong: Notify::new(),
        }
    }

    /// Returns the connection id.
    #[must_use]
    pub const fn id(&self) -> ConnId {
        self.id
    }

    /// Returns the device's remote address, for logging.
    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Queues a text frame for delivery to the device.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ConnectionClosed`] if the write loop has exited.
    pub fn send_text(&self, text: String) -> Result<(), HubError> {
        self.outbound
            .send(Message::text(text))
            .map_err(|_| HubError::ConnectionClosed(self.id))
    }

    /// Queues a liveness ping for delivery to the device.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ConnectionClosed`] if the write loop has exited.
    pub fn send_ping(&self) -> Result<(), HubError> {
        self.outbound
            .send(Message::Ping(Bytes::new()))
            .map_err(|_| HubError::ConnectionClosed(self.id))
    }

    /// Records a pong from the device, waking any pending probe.
    pub fn note_pong(&self) {
        self.pong.notify_one();
    }

    /// Resolves when the device next answers a ping.
    ///
    /// A pong received just before this call counts: `notify_one` stores a
    /// permit, so a probe never misses an answer that raced it.
    pub async fn wait_pong(&self) {
        self.pong.notified().await;
    }
}
