//! WebSocket transport: upgrade handling and the per-connection loop.
//!
//! Devices connect with plain JSON text frames; the hub registers each
//! accepted socket, routes its frames, and unregisters it on any exit.

pub mod connection;
pub mod handler;
