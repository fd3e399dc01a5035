//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! register(pattern, subscriber)
//!     → path.rs (split pattern into raw segments)
//!     → level.rs (find or create one node per segment, attach subscriber)
//!     → matcher.rs (compile segment when a node is created)
//!     → cache.rs (remember subscriber → pattern)
//!
//! handle(topic, payload)
//!     → path.rs (split topic, reject pattern syntax)
//!     → level.rs (walk levels, match tokens, collect captures)
//!     → dispatch.rs (fire subscribers, contain failures, trace)
//! ```
//!
//! # Design Decisions
//! - Every matching sibling fires; there is no first-match cutover
//! - Dispatch is synchronous on the caller's thread
//! - Registration is safe from inside a subscriber callback

mod dispatch;

pub mod cache;
pub mod level;
pub mod matcher;
pub mod message;
pub mod path;
pub mod router;
pub mod subscriber;
pub mod types;

pub use message::{Context, Message};
pub use router::{DispatchReport, Subscription};
pub use subscriber::{BoxError, Subscriber, SubscriberHandle, SubscriberId};
pub use types::{RouterError, RouterResult};
