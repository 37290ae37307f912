//! Wire envelopes exchanged with devices.
//!
//! Inbound frames carry `{id?, type, value}`; outbound envelopes carry
//! `{type, target?, value, id}` where `id` threads back to the originating
//! request so a device can correlate multiple in-flight calls.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Sentinel `id` used when a request carries none.
pub const NO_ID: &str = "no_id";

/// A parsed inbound request frame.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Correlation id chosen by the device. Optional.
    #[serde(default)]
    pub id: Option<String>,
    /// Declared request kind; see [`RequestKind`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Request payload, passed through to the backend callback.
    #[serde(default)]
    pub value: Value,
}

/// Closed set of request kinds the router dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Open a URL on the host. Side effect only, no broadcast.
    Open,
    /// Run the video callback; broadcast its single result.
    Video,
    /// Fan out to the recommendation, SERP, and web-search callbacks;
    /// broadcast each result as it completes.
    Recommend,
    /// Persist a note. Side effect only, no broadcast.
    Save,
}

impl RequestKind {
    /// Maps a wire tag to a kind. Returns `None` for unknown tags, which
    /// the router rejects explicitly instead of ignoring.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "open" => Some(Self::Open),
            "video" => Some(Self::Video),
            "recommend" => Some(Self::Recommend),
            "save" => Some(Self::Save),
            _ => None,
        }
    }
}

/// An outbound envelope broadcast to devices or echoed to a sender.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope {
    /// Envelope type: `echo`, `error`, or a backend tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional backend-defined render target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Envelope payload.
    pub value: Value,
    /// Correlation id of the originating request.
    pub id: String,
}

impl ResultEnvelope {
    /// Builds the unconditional acknowledgment echoing `raw` back to the
    /// sending device.
    #[must_use]
    pub fn echo(id: &str, raw: &str) -> Self {
        Self {
            kind: "echo".to_string(),
            target: None,
            value: Value::String(raw.to_string()),
            id: id.to_string(),
        }
    }

    /// Builds a structured error envelope.
    #[must_use]
    pub fn error(id: &str, message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            target: None,
            value: Value::String(message.into()),
            id: id.to_string(),
        }
    }
}

/// Shapes a backend result for broadcast.
///
/// A backend returning an object that already carries a `type` field is
/// treated as a full envelope and only gets the request `id` injected.
/// Anything else is wrapped as `{"type": tag, "value": result, "id": id}`.
#[must_use]
pub fn tag_backend_result(id: &str, tag: &str, result: Value) -> Value {
    if let Value::Object(mut map) = result {
        if map.contains_key("type") {
            map.insert("id".to_string(), json!(id));
            return Value::Object(map);
        }
        return json!({"type": tag, "value": Value::Object(map), "id": id});
    }
    json!({"type": tag, "value": result, "id": id})
}
