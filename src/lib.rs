//! # assistant-hub
//!
//! Broadcast hub for an augmented-reading assistant. Client devices
//! (HoloLens, browser viewers) connect over WebSocket and send JSON
//! requests; the hub routes each request to an injected asynchronous
//! backend callback (video keywords, LLM recommendation, SERP search,
//! web search, note persistence, URL opening) and broadcasts results to
//! every connected device, correlated by request id. A companion UDP
//! transport implements the same liveness pattern over datagrams.
//!
//! The backends themselves are external collaborators: the hub is a
//! coordination layer and treats each callback as an opaque async
//! function.
//!
//! ## Architecture
//!
//! ```text
//! Devices (WebSocket, UDP)
//!     │
//!     ├── WS Loop (ws/) ── supervised listener (server)
//!     ├── UDP Hub (udp/)
//!     │
//!     ├── RequestRouter (router/)
//!     ├── BackendCallbacks (backend)
//!     │
//!     ├── Dispatcher ── ConnectionRegistry (hub/)
//!     └── LivenessMonitor (hub/)
//! ```

pub mod app_state;
pub mod backend;
pub mod config;
pub mod error;
pub mod hub;
pub mod router;
pub mod server;
pub mod udp;
pub mod ws;
