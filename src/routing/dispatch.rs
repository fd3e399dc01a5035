//! Protected subscriber invocation.
//!
//! # Responsibilities
//! - Call each matched subscriber outside of any tree lock
//! - Contain panics and errors per call so the walk always continues
//! - Report failures to the tracer as JSON payloads
//!
//! # Design Decisions
//! - The backtrace is taken by a process-wide panic hook while the panicking
//!   frame is still on the stack; the hook only acts for threads inside a
//!   protected call and defers to the previous hook otherwise

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use serde_json::json;

use crate::config::RouterConfig;
use crate::observability::{metrics, Tracer};
use crate::routing::message::{Context, Message};
use crate::routing::subscriber::SubscriberHandle;

/// State shared by one `handle` call while it walks the tree.
pub(crate) struct Dispatch<'a> {
    pub(crate) ctx: &'a Context,
    tracer: Option<&'a dyn Tracer>,
    config: &'a RouterConfig,
    delivered: Cell<usize>,
    failed: Cell<usize>,
}

impl<'a> Dispatch<'a> {
    pub(crate) fn new(
        ctx: &'a Context,
        tracer: Option<&'a dyn Tracer>,
        config: &'a RouterConfig,
    ) -> Self {
        Self {
            ctx,
            tracer,
            config,
            delivered: Cell::new(0),
            failed: Cell::new(0),
        }
    }

    /// Fire every subscriber in `subscribers` with `message`.
    pub(crate) fn fire_all(&self, subscribers: &[SubscriberHandle], message: &Message) {
        for subscriber in subscribers {
            self.fire_one(subscriber, message);
        }
    }

    fn fire_one(&self, subscriber: &SubscriberHandle, message: &Message) {
        install_panic_hook();
        let outcome = {
            let _guard = ProtectedCall::enter(self.config.capture_backtraces);
            panic::catch_unwind(AssertUnwindSafe(|| subscriber.fire(self.ctx, message)))
        };

        match outcome {
            Ok(Ok(())) => {
                self.delivered.set(self.delivered.get() + 1);
                metrics::record_delivery();
            }
            Ok(Err(e)) => {
                self.failed.set(self.failed.get() + 1);
                metrics::record_subscriber_failure("error");
                tracing::debug!(
                    subscriber = subscriber.name(),
                    topic = %message.topic,
                    error = %e,
                    "Subscriber returned an error"
                );
                if self.config.trace_subscriber_errors {
                    self.trace(json!({
                        "event": "subscriber_error",
                        "dispatch_id": self.ctx.id,
                        "subscriber": subscriber.name(),
                        "topic": message.topic,
                        "route": message.matched_path(self.config.separator),
                        "error": e.to_string(),
                    }));
                }
            }
            Err(panic_payload) => {
                self.failed.set(self.failed.get() + 1);
                metrics::record_subscriber_failure("panic");
                let reason = panic_message(panic_payload.as_ref());
                tracing::warn!(
                    subscriber = subscriber.name(),
                    topic = %message.topic,
                    reason = %reason,
                    "Subscriber panicked during dispatch"
                );
                let backtrace = PANIC_BACKTRACE
                    .with(|slot| slot.borrow_mut().take())
                    .unwrap_or_default();
                self.trace(json!({
                    "event": "subscriber_panic",
                    "dispatch_id": self.ctx.id,
                    "subscriber": subscriber.name(),
                    "topic": message.topic,
                    "route": message.matched_path(self.config.separator),
                    "error": reason,
                    "backtrace": backtrace,
                }));
            }
        }
    }

    /// Send a JSON diagnostic to the tracer, if any.
    pub(crate) fn trace(&self, event: serde_json::Value) {
        if let Some(tracer) = self.tracer {
            tracer.trace(event.to_string().as_bytes());
        }
    }

    pub(crate) fn delivered(&self) -> usize {
        self.delivered.get()
    }

    pub(crate) fn failed(&self) -> usize {
        self.failed.get()
    }
}

thread_local! {
    /// `Some(capture_backtraces)` while this thread runs a subscriber.
    static PROTECTED: Cell<Option<bool>> = const { Cell::new(None) };
    /// Backtrace recorded by the hook for the last protected panic.
    static PANIC_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Marks the current thread as running a subscriber until dropped.
///
/// Restores the outer state on drop, so re-entrant dispatch from inside a
/// subscriber keeps working.
struct ProtectedCall {
    outer: Option<bool>,
}

impl ProtectedCall {
    fn enter(capture_backtraces: bool) -> Self {
        PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take());
        let outer = PROTECTED.with(|p| p.replace(Some(capture_backtraces)));
        Self { outer }
    }
}

impl Drop for ProtectedCall {
    fn drop(&mut self) {
        PROTECTED.with(|p| p.set(self.outer));
    }
}

fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            match PROTECTED.with(Cell::get) {
                Some(true) => {
                    let backtrace = Backtrace::force_capture().to_string();
                    PANIC_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
                }
                // Reported through the tracer instead
                Some(false) => {}
                None => previous(info),
            }
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
