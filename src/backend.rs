//! Injected backend callback table.
//!
//! The hub treats every backend — video keyword extraction, the LLM
//! recommender, SERP search, generic web search, note persistence, URL
//! opening — as an opaque asynchronous function from a JSON value to a
//! JSON value. The embedding application wires real implementations in at
//! startup through [`BackendCallbacks::builder`]; unwired slots reject
//! requests with an error instead of panicking.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

/// Result of one backend invocation.
pub type BackendResult = Result<Value, anyhow::Error>;

/// A named asynchronous backend callback.
pub type BackendFn = Arc<dyn Fn(Value) -> BoxFuture<'static, BackendResult> + Send + Sync>;

/// Wraps an async closure into a [`BackendFn`].
pub fn backend_fn<F, Fut>(f: F) -> BackendFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BackendResult> + Send + 'static,
{
    Arc::new(move |value| Box::pin(f(value)))
}

/// The named backend slots the router can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSlot {
    /// Video transcript keyword extraction.
    Video,
    /// LLM recommendation.
    Recommend,
    /// SERP-API search.
    Serp,
    /// Generic web search.
    Serper,
    /// Note persistence.
    Save,
    /// Open a URL on the host (side effect only).
    Open,
}

impl BackendSlot {
    /// Returns the wire tag for this slot, used as the `type` of result
    /// envelopes and in log output.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Recommend => "recommend",
            Self::Serp => "serp",
            Self::Serper => "serper",
            Self::Save => "save",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for BackendSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Process-wide table of backend callbacks, injected at construction.
#[derive(Clone)]
pub struct BackendCallbacks {
    video: BackendFn,
    recommend: BackendFn,
    serp: BackendFn,
    serper: BackendFn,
    save: BackendFn,
    open: BackendFn,
}

impl BackendCallbacks {
    /// Starts building a callback table. Slots left unset reject requests
    /// with an error result.
    #[must_use]
    pub fn builder() -> BackendCallbacksBuilder {
        BackendCallbacksBuilder::default()
    }

    /// Invokes the callback in `slot` with `value`.
    #[must_use]
    pub fn invoke(&self, slot: BackendSlot, value: Value) -> BoxFuture<'static, BackendResult> {
        let callback = match slot {
            BackendSlot::Video => &self.video,
            BackendSlot::Recommend => &self.recommend,
            BackendSlot::Serp => &self.serp,
            BackendSlot::Serper => &self.serper,
            BackendSlot::Save => &self.save,
            BackendSlot::Open => &self.open,
        };
        callback(value)
    }
}

impl fmt::Debug for BackendCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCallbacks").finish_non_exhaustive()
    }
}

/// Builder for [`BackendCallbacks`].
#[derive(Default)]
pub struct BackendCallbacksBuilder {
    video: Option<BackendFn>,
    recommend: Option<BackendFn>,
    serp: Option<BackendFn>,
    serper: Option<BackendFn>,
    save: Option<BackendFn>,
    open: Option<BackendFn>,
}

impl BackendCallbacksBuilder {
    /// Sets the video keyword callback.
    #[must_use]
    pub fn video(mut self, f: BackendFn) -> Self {
        self.video = Some(f);
        self
    }

    /// Sets the LLM recommendation callback.
    #[must_use]
    pub fn recommend(mut self, f: BackendFn) -> Self {
        self.recommend = Some(f);
        self
    }

    /// Sets the SERP-API search callback.
    #[must_use]
    pub fn serp(mut self, f: BackendFn) -> Self {
        self.serp = Some(f);
        self
    }

    /// Sets the generic web search callback.
    #[must_use]
    pub fn serper(mut self, f: BackendFn) -> Self {
        self.serper = Some(f);
        self
    }

    /// Sets the note persistence callback.
    #[must_use]
    pub fn save(mut self, f: BackendFn) -> Self {
        self.save = Some(f);
        self
    }

    /// Sets the URL-opening callback.
    #[must_use]
    pub fn open(mut self, f: BackendFn) -> Self {
        self.open = Some(f);
        self
    }

    /// Finalizes the table, filling unset slots with rejecting stubs.
    #[must_use]
    pub fn build(self) -> BackendCallbacks {
        BackendCallbacks {
            video: self.video.unwrap_or_else(|| unwired(BackendSlot::Video)),
            recommend: self
                .recommend
                .unwrap_or_else(|| unwired(BackendSlot::Recommend)),
            serp: self.serp.unwrap_or_else(|| unwired(BackendSlot::Serp)),
            serper: self.serper.unwrap_or_else(|| unwired(BackendSlot::Serper)),
            save: self.save.unwrap_or_else(|| unwired(BackendSlot::Save)),
            open: self.open.unwrap_or_else(|| unwired(BackendSlot::Open)),
        }
    }
}

impl fmt::Debug for BackendCallbacksBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCallbacksBuilder")
            .finish_non_exhaustive()
    }
}

/// Stub for a slot no callback was registered for.
fn unwired(slot: BackendSlot) -> BackendFn {
    backend_fn(move |_| async move { Err(anyhow::anyhow!("no '{slot}' backend registered")) })
}
