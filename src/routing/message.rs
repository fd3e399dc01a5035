//! Dispatch context and per-dispatch message.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

/// Per-dispatch context handed to every subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct Context {
    /// Correlation ID for this dispatch.
    pub id: Uuid,
    /// Caller supplied metadata.
    pub values: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            values: HashMap::new(),
        }
    }

    /// Attach a metadata value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// A topic being delivered to subscribers.
///
/// Built fresh by each dispatch. Every matching branch of the tree works on
/// its own copy, so captures from one branch never leak into a sibling. The
/// payload is shared between copies.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// The concrete topic being dispatched.
    pub topic: String,
    /// Raw pattern segments matched so far.
    pub path: Vec<String>,
    /// Captured parameters by name.
    pub params: HashMap<String, String>,
    /// Opaque payload.
    #[serde(skip)]
    pub payload: Arc<[u8]>,
    /// Who published the topic.
    pub source: String,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<Arc<[u8]>>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            path: Vec::new(),
            params: HashMap::new(),
            payload: payload.into(),
            source: source.into(),
        }
    }

    /// Look up a captured parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The matched pattern so far, joined with `separator`.
    pub fn matched_path(&self, separator: char) -> String {
        self.path.join(&separator.to_string())
    }

    /// Payload as UTF-8, lossily.
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
