//! Core hub domain: connection identity, registry, broadcast, liveness.
//!
//! The hub owns the set of live device connections and everything that
//! mutates it: accept/disconnect (via the transport layer), broadcast
//! failures, and liveness eviction.

pub mod conn_id;
pub mod connection;
pub mod dispatcher;
pub mod monitor;
pub mod registry;

pub use conn_id::ConnId;
pub use connection::Connection;
pub use dispatcher::Dispatcher;
pub use monitor::LivenessMonitor;
pub use registry::ConnectionRegistry;
