//! Shared utilities for integration and load testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use topic_router::{BoxError, Context, Message, Subscriber, SubscriberHandle};

/// Records every message it receives.
#[derive(Default)]
pub struct RecordingSubscriber {
    seen: Mutex<Vec<Message>>,
}

impl RecordingSubscriber {
    /// Returns the shared recorder and a handle to register.
    pub fn handle() -> (Arc<Self>, SubscriberHandle) {
        let recorder = Arc::new(Self::default());
        let dyn_recorder: Arc<dyn Subscriber> = recorder.clone();
        (recorder, SubscriberHandle::from(dyn_recorder))
    }

    #[allow(dead_code)]
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn topics(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|m| m.topic.clone()).collect()
    }

    #[allow(dead_code)]
    pub fn params(&self) -> Vec<HashMap<String, String>> {
        self.seen.lock().unwrap().iter().map(|m| m.params.clone()).collect()
    }
}

impl Subscriber for RecordingSubscriber {
    fn fire(&self, _ctx: &Context, message: &Message) -> Result<(), BoxError> {
        self.seen.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Counts deliveries without storing them.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingSubscriber {
    count: AtomicUsize,
}

#[allow(dead_code)]
impl CountingSubscriber {
    pub fn handle() -> (Arc<Self>, SubscriberHandle) {
        let counter = Arc::new(Self::default());
        let dyn_counter: Arc<dyn Subscriber> = counter.clone();
        (counter, SubscriberHandle::from(dyn_counter))
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Subscriber for CountingSubscriber {
    fn fire(&self, _ctx: &Context, _message: &Message) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Panics on every delivery.
#[allow(dead_code)]
pub fn panicking_subscriber(reason: &'static str) -> SubscriberHandle {
    SubscriberHandle::new(move |_: &Context, _: &Message| -> Result<(), BoxError> { panic!("{}", reason) })
}

/// Returns an error on every delivery.
#[allow(dead_code)]
pub fn failing_subscriber(reason: &'static str) -> SubscriberHandle {
    SubscriberHandle::new(move |_: &Context, _: &Message| -> Result<(), BoxError> { Err(reason.into()) })
}
