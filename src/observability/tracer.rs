//! Diagnostic tracer collaborator.
//!
//! The router reports dispatch-time problems (subscriber panics, subscriber
//! errors, rejected topics) as free-form byte payloads. Payloads produced by
//! this crate are JSON objects with at least an `event` field.

use parking_lot::Mutex;

/// Receives diagnostic payloads from the router.
pub trait Tracer: Send + Sync {
    fn trace(&self, payload: &[u8]);
}

impl<F> Tracer for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn trace(&self, payload: &[u8]) {
        self(payload)
    }
}

/// Forwards payloads to the `tracing` subscriber at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace(&self, payload: &[u8]) {
        tracing::warn!(
            target: "topic_router::diagnostics",
            payload = %String::from_utf8_lossy(payload),
            "Router diagnostic"
        );
    }
}

/// Keeps every payload in memory.
#[derive(Debug, Default)]
pub struct MemoryTracer {
    entries: Mutex<Vec<Vec<u8>>>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payloads received so far.
    pub fn entries(&self) -> Vec<Vec<u8>> {
        self.entries.lock().clone()
    }

    /// Payloads that parse as JSON.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.entries
            .lock()
            .iter()
            .filter_map(|p| serde_json::from_slice(p).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Tracer for MemoryTracer {
    fn trace(&self, payload: &[u8]) {
        self.entries.lock().push(payload.to_vec());
    }
}
