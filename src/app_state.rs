//! Shared application state injected into the WebSocket handler.

use std::sync::Arc;

use crate::backend::BackendCallbacks;
use crate::hub::{ConnectionRegistry, Dispatcher};
use crate::router::RequestRouter;

/// Shared hub state available to every connection via Axum's `State`
/// extractor: one registry, one dispatcher over it, one router over the
/// injected backend callbacks.
#[derive(Debug, Clone)]
pub struct HubState {
    /// Live-connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Broadcast dispatcher over the registry.
    pub dispatcher: Arc<Dispatcher>,
    /// Request router over the injected callbacks.
    pub router: Arc<RequestRouter>,
}

impl HubState {
    /// Builds the hub around an injected callback table.
    #[must_use]
    pub fn new(callbacks: BackendCallbacks) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        let router = Arc::new(RequestRouter::new(Arc::clone(&dispatcher), callbacks));
        Self {
            registry,
            dispatcher,
            router,
        }
    }
}
