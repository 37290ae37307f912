//! Hub error types.
//!
//! [`HubError`] is the central error type for the hub. Transport and parse
//! failures are scoped to a single connection; listener-level I/O errors are
//! retried by the supervisor in [`crate::server`].

/// Server-side error enum covering framing, transport, and listener failures.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The outbound channel for a connection is closed; the device is gone.
    #[error("connection {0} is closed")]
    ConnectionClosed(crate::hub::ConnId),

    /// An inbound frame was not valid JSON, or an outbound envelope failed
    /// to serialize. Connection-fatal on the inbound path.
    #[error("bad frame: {0}")]
    Frame(#[from] serde_json::Error),

    /// Listener-level I/O failure (bind, accept, serve).
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}
