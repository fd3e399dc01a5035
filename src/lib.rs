//! Hierarchical topic subscription router.
//!
//! Subscribers register interest in separator-delimited patterns such as
//! `user.:id`, `log.{level:[A-Z]+}`, `sensor.^temp` or `*`. Dispatching a
//! concrete topic fires every matching subscriber with the captured
//! parameters, isolating panics per subscriber.
//!
//! ```
//! use topic_router::{BoxError, Context, Message, Subscription, SubscriberHandle};
//!
//! let router = Subscription::new(None);
//! let sub = SubscriberHandle::new(|_: &Context, msg: &Message| -> Result<(), BoxError> {
//!     assert_eq!(msg.param("id"), Some("42"));
//!     Ok(())
//! });
//! router.register("user.:id", &sub).unwrap();
//! router.handle(&Context::new(), "user.42", b"".to_vec(), "docs");
//! assert_eq!(router.routes_for(&sub).unwrap(), vec!["user.:id"]);
//! ```

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod sinks;

pub use config::{AppConfig, RouterConfig};
pub use observability::{LogTracer, MemoryTracer, Tracer};
pub use routing::{
    BoxError, Context, DispatchReport, Message, RouterError, RouterResult, Subscriber,
    SubscriberHandle, Subscription,
};
