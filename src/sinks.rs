//! Built-in subscribers used by the `topic-router` binary.

use std::io::Write;

use serde_json::json;

use crate::config::SinkKind;
use crate::routing::{BoxError, Context, Message, Subscriber, SubscriberHandle};

/// Writes one JSON line per delivery to stdout.
#[derive(Debug, Clone)]
pub struct StdoutSink {
    route: String,
}

impl StdoutSink {
    pub fn new(route: impl Into<String>) -> Self {
        Self { route: route.into() }
    }
}

impl Subscriber for StdoutSink {
    fn fire(&self, ctx: &Context, message: &Message) -> Result<(), BoxError> {
        let line = delivery_record(&self.route, ctx, message);
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.route
    }
}

/// Emits a `tracing` INFO event per delivery.
#[derive(Debug, Clone)]
pub struct LogSink {
    route: String,
}

impl LogSink {
    pub fn new(route: impl Into<String>) -> Self {
        Self { route: route.into() }
    }
}

impl Subscriber for LogSink {
    fn fire(&self, ctx: &Context, message: &Message) -> Result<(), BoxError> {
        tracing::info!(
            route = %self.route,
            dispatch_id = %ctx.id,
            topic = %message.topic,
            params = ?message.params,
            source = %message.source,
            bytes = message.payload.len(),
            "Delivered"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.route
    }
}

/// Build the subscriber for a configured sink.
pub fn build_sink(route: &str, kind: SinkKind) -> SubscriberHandle {
    match kind {
        SinkKind::Stdout => SubscriberHandle::new(StdoutSink::new(route)),
        SinkKind::Log => SubscriberHandle::new(LogSink::new(route)),
    }
}

fn delivery_record(route: &str, ctx: &Context, message: &Message) -> serde_json::Value {
    json!({
        "route": route,
        "dispatch_id": ctx.id,
        "topic": message.topic,
        "params": message.params,
        "source": message.source,
        "payload": message.payload_str(),
    })
}
