//! Inbound request routing.
//!
//! One frame flows through three steps: parse, unconditional echo to the
//! sender, then dispatch by declared kind. `recommend` fans a single
//! request out to three concurrent backend calls and broadcasts each
//! result as it completes; a failure in one leg never suppresses the
//! others. Backend errors are reported as `{"type": "error"}` envelopes
//! instead of terminating the connection.

pub mod messages;

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use crate::backend::{BackendCallbacks, BackendSlot};
use crate::error::HubError;
use crate::hub::{Connection, Dispatcher};
use self::messages::{InboundFrame, NO_ID, RequestKind, ResultEnvelope, tag_backend_result};

/// Parses inbound frames and dispatches them to backend callbacks.
#[derive(Debug)]
pub struct RequestRouter {
    dispatcher: Arc<Dispatcher>,
    callbacks: BackendCallbacks,
}

impl RequestRouter {
    /// Creates a router broadcasting through `dispatcher` and invoking
    /// the injected `callbacks`.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, callbacks: BackendCallbacks) -> Self {
        Self {
            dispatcher,
            callbacks,
        }
    }

    /// Handles one inbound text frame from `conn`.
    ///
    /// The frame is handled to completion before the caller reads the next
    /// one, so per-connection ordering holds. Results of `video` and
    /// `recommend` are broadcast to every registered device.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Frame`] on malformed JSON and
    /// [`HubError::ConnectionClosed`] if the sender is gone; both are
    /// connection-fatal and the caller must exit its receive loop.
    pub async fn handle_frame(&self, conn: &Arc<Connection>, raw: &str) -> Result<(), HubError> {
        let frame: InboundFrame = serde_json::from_str(raw)?;
        let id = frame.id.unwrap_or_else(|| NO_ID.to_string());

        // Acknowledge receipt to the sender only, before any dispatch.
        let echo = ResultEnvelope::echo(&id, raw);
        conn.send_text(serde_json::to_string(&echo)?)?;

        let Some(kind) = RequestKind::parse(&frame.kind) else {
            warn!(conn = %conn.id(), kind = %frame.kind, "rejecting unknown request kind");
            let error = ResultEnvelope::error(&id, format!("unknown request type: {}", frame.kind));
            conn.send_text(serde_json::to_string(&error)?)?;
            return Ok(());
        };

        match kind {
            RequestKind::Open => self.run_side_effect(conn, BackendSlot::Open, &id, frame.value).await,
            RequestKind::Save => self.run_side_effect(conn, BackendSlot::Save, &id, frame.value).await,
            RequestKind::Video => self.run_broadcasting(BackendSlot::Video, &id, frame.value).await,
            RequestKind::Recommend => self.fan_out(&id, frame.value).await,
        }
        Ok(())
    }

    /// Runs a side-effect-only callback. Nothing is broadcast; a failure
    /// is reported to the sender alone, since no other device asked.
    async fn run_side_effect(
        &self,
        conn: &Arc<Connection>,
        slot: BackendSlot,
        id: &str,
        value: serde_json::Value,
    ) {
        if let Err(error) = self.callbacks.invoke(slot, value).await {
            warn!(conn = %conn.id(), %slot, %error, "backend call failed");
            let envelope = ResultEnvelope::error(id, error.to_string());
            if let Ok(json) = serde_json::to_string(&envelope) {
                let _ = conn.send_text(json);
            }
        }
    }

    /// Runs a single callback and broadcasts its result, or a structured
    /// error envelope on failure.
    async fn run_broadcasting(&self, slot: BackendSlot, id: &str, value: serde_json::Value) {
        match self.callbacks.invoke(slot, value).await {
            Ok(result) => {
                self.dispatcher
                    .broadcast(&tag_backend_result(id, slot.tag(), result))
                    .await;
            }
            Err(error) => {
                warn!(%slot, %error, "backend call failed");
                self.dispatcher
                    .broadcast(&ResultEnvelope::error(id, error.to_string()))
                    .await;
            }
        }
    }

    /// Fans one `recommend` request out to three concurrent backend calls,
    /// broadcasting each result in completion order. Dropping the caller
    /// aborts still-pending legs.
    async fn fan_out(&self, id: &str, value: serde_json::Value) {
        let mut legs = JoinSet::new();
        for slot in [BackendSlot::Recommend, BackendSlot::Serp, BackendSlot::Serper] {
            let call = self.callbacks.invoke(slot, value.clone());
            legs.spawn(async move { (slot, call.await) });
        }

        while let Some(joined) = legs.join_next().await {
            match joined {
                Ok((slot, Ok(result))) => {
                    self.dispatcher
                        .broadcast(&tag_backend_result(id, slot.tag(), result))
                        .await;
                }
                Ok((slot, Err(error))) => {
                    warn!(%slot, %error, "fan-out leg failed");
                    self.dispatcher
                        .broadcast(&ResultEnvelope::error(id, error.to_string()))
                        .await;
                }
                Err(error) => {
                    warn!(%error, "fan-out leg panicked");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::backend_fn;
    use crate::hub::ConnectionRegistry;
    use axum::extract::ws::Message;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn make_conn() -> (Arc<Connection>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let Ok(addr) = "127.0.0.1:9000".parse() else {
            panic!("valid test address");
        };
        (Arc::new(Connection::new(addr, tx)), rx)
    }

    fn make_router(callbacks: BackendCallbacks) -> (Arc<ConnectionRegistry>, RequestRouter) {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        (registry, RequestRouter::new(dispatcher, callbacks))
    }

    /// Drains every queued text frame into parsed JSON values.
    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Message::Text(text) = msg {
                let Ok(value) = serde_json::from_str(text.as_str()) else {
                    panic!("outbound frame should be valid JSON");
                };
                frames.push(value);
            }
        }
        frames
    }

    fn kind_of(frame: &Value) -> &str {
        let Some(kind) = frame.get("type").and_then(Value::as_str) else {
            panic!("frame should carry a type");
        };
        kind
    }

    #[tokio::test]
    async fn echo_goes_to_sender_only() {
        let callbacks = BackendCallbacks::builder()
            .open(backend_fn(|_| async move { Ok(Value::Null) }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, mut sender_rx) = make_conn();
        let (other, mut other_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(other).await;

        let raw = r#"{"id":"abc","type":"open","value":"http://example.com"}"#;
        let Ok(()) = router.handle_frame(&sender, raw).await else {
            panic!("open request should succeed");
        };

        let sender_frames = drain(&mut sender_rx);
        let Some(echo) = sender_frames.first() else {
            panic!("sender should receive the echo");
        };
        assert_eq!(echo.get("type"), Some(&json!("echo")));
        assert_eq!(echo.get("id"), Some(&json!("abc")));
        assert_eq!(echo.get("value"), Some(&json!(raw)));
        assert_eq!(sender_frames.len(), 1);

        // `open` broadcasts nothing, so the other device hears nothing.
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn missing_id_defaults_to_sentinel() {
        let callbacks = BackendCallbacks::builder()
            .save(backend_fn(|_| async move { Ok(Value::Null) }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, mut rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"type":"save","value":"note"}"#)
            .await
        else {
            panic!("save request should succeed");
        };

        let frames = drain(&mut rx);
        let Some(echo) = frames.first() else {
            panic!("sender should receive the echo");
        };
        assert_eq!(echo.get("id"), Some(&json!(NO_ID)));
    }

    #[tokio::test]
    async fn malformed_json_is_connection_fatal() {
        let (_registry, router) = make_router(BackendCallbacks::builder().build());
        let (sender, _rx) = make_conn();

        let result = router.handle_frame(&sender, "not json").await;
        assert!(matches!(result, Err(HubError::Frame(_))));
    }

    #[tokio::test]
    async fn unknown_kind_gets_error_reply_no_broadcast() {
        let (registry, router) = make_router(BackendCallbacks::builder().build());

        let (sender, mut sender_rx) = make_conn();
        let (other, mut other_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(other).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"id":"x","type":"shutdown","value":null}"#)
            .await
        else {
            panic!("unknown kind should not be connection-fatal");
        };

        let frames = drain(&mut sender_rx);
        assert_eq!(frames.len(), 2);
        let kinds: Vec<&str> = frames.iter().map(kind_of).collect();
        assert_eq!(kinds, vec!["echo", "error"]);
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn video_broadcasts_one_result_with_request_id() {
        let callbacks = BackendCallbacks::builder()
            .video(backend_fn(|value| async move {
                Ok(json!({"keywords": value}))
            }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, mut sender_rx) = make_conn();
        let (other, mut other_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(other).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"id":"vid-1","type":"video","value":"transcript"}"#)
            .await
        else {
            panic!("video request should succeed");
        };

        // Sender sees the echo plus the broadcast result.
        let sender_frames = drain(&mut sender_rx);
        assert_eq!(sender_frames.len(), 2);

        // Other devices see exactly the one result.
        let other_frames = drain(&mut other_rx);
        assert_eq!(other_frames.len(), 1);
        let Some(result) = other_frames.first() else {
            panic!("other device should receive the result");
        };
        assert_eq!(result.get("type"), Some(&json!("video")));
        assert_eq!(result.get("id"), Some(&json!("vid-1")));
        assert_eq!(result.get("value"), Some(&json!({"keywords": "transcript"})));
    }

    #[tokio::test(start_paused = true)]
    async fn recommend_broadcasts_in_completion_order() {
        // Completion order deliberately reverses wiring order.
        let callbacks = BackendCallbacks::builder()
            .recommend(backend_fn(|_| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(json!("llm"))
            }))
            .serp(backend_fn(|_| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!("serp"))
            }))
            .serper(backend_fn(|_| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(json!("web"))
            }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, _sender_rx) = make_conn();
        let (listener, mut listener_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(listener).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"id":"rec-1","type":"recommend","value":"query"}"#)
            .await
        else {
            panic!("recommend request should succeed");
        };

        let frames = drain(&mut listener_rx);
        assert_eq!(frames.len(), 3);
        let kinds: Vec<&str> = frames.iter().map(kind_of).collect();
        assert_eq!(kinds, vec!["serper", "serp", "recommend"]);
        assert!(frames.iter().all(|f| f.get("id") == Some(&json!("rec-1"))));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_leg_does_not_suppress_others() {
        let callbacks = BackendCallbacks::builder()
            .recommend(backend_fn(|_| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(json!("llm"))
            }))
            .serp(backend_fn(|_| async move {
                Err(anyhow::anyhow!("quota exhausted"))
            }))
            .serper(backend_fn(|_| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(json!("web"))
            }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, _sender_rx) = make_conn();
        let (listener, mut listener_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(listener).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"id":"rec-2","type":"recommend","value":"query"}"#)
            .await
        else {
            panic!("recommend request should succeed");
        };

        let frames = drain(&mut listener_rx);
        assert_eq!(frames.len(), 3);
        let kinds: Vec<&str> = frames.iter().map(kind_of).collect();
        assert!(kinds.contains(&"error"));
        assert!(kinds.contains(&"recommend"));
        assert!(kinds.contains(&"serper"));
    }

    #[tokio::test]
    async fn save_broadcasts_nothing() {
        let callbacks = BackendCallbacks::builder()
            .save(backend_fn(|_| async move { Ok(Value::Null) }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, mut sender_rx) = make_conn();
        let (other, mut other_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(other).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"id":"n1","type":"save","value":"note text"}"#)
            .await
        else {
            panic!("save request should succeed");
        };

        // Echo only; persistence produces no broadcast.
        assert_eq!(drain(&mut sender_rx).len(), 1);
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn side_effect_failure_reported_to_sender_only() {
        let callbacks = BackendCallbacks::builder()
            .save(backend_fn(|_| async move {
                Err(anyhow::anyhow!("disk full"))
            }))
            .build();
        let (registry, router) = make_router(callbacks);

        let (sender, mut sender_rx) = make_conn();
        let (other, mut other_rx) = make_conn();
        registry.register(Arc::clone(&sender)).await;
        registry.register(other).await;

        let Ok(()) = router
            .handle_frame(&sender, r#"{"id":"n2","type":"save","value":"note"}"#)
            .await
        else {
            panic!("failed save should not kill the connection");
        };

        let frames = drain(&mut sender_rx);
        let kinds: Vec<&str> = frames.iter().map(kind_of).collect();
        assert_eq!(kinds, vec!["echo", "error"]);
        assert!(drain(&mut other_rx).is_empty());
    }
}
