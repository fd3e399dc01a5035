//! Subscriber capability and shared handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::routing::message::{Context, Message};

/// Boxed error returned by subscribers. Only ever traced, never retried.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Anything that can receive dispatched messages.
pub trait Subscriber: Send + Sync {
    /// Deliver one matched message.
    fn fire(&self, ctx: &Context, message: &Message) -> Result<(), BoxError>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Subscriber for F
where
    F: Fn(&Context, &Message) -> Result<(), BoxError> + Send + Sync,
{
    fn fire(&self, ctx: &Context, message: &Message) -> Result<(), BoxError> {
        self(ctx, message)
    }
}

/// Opaque identity of a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(usize);

/// A shared subscriber. Equality and hashing follow pointer identity, so two
/// clones of one handle are the same subscriber and two separately created
/// handles never are.
#[derive(Clone)]
pub struct SubscriberHandle {
    inner: Arc<dyn Subscriber>,
}

impl SubscriberHandle {
    pub fn new<S: Subscriber + 'static>(subscriber: S) -> Self {
        Self {
            inner: Arc::new(subscriber),
        }
    }

    pub fn id(&self) -> SubscriberId {
        SubscriberId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub(crate) fn fire(&self, ctx: &Context, message: &Message) -> Result<(), BoxError> {
        self.inner.fire(ctx, message)
    }
}

impl From<Arc<dyn Subscriber>> for SubscriberHandle {
    fn from(inner: Arc<dyn Subscriber>) -> Self {
        Self { inner }
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SubscriberHandle {}

impl Hash for SubscriberHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
