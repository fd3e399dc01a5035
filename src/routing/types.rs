//! Routing error definitions.

use thiserror::Error;

/// Errors that can occur while registering, removing or dispatching topics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// A pattern segment could not be compiled.
    #[error("Malformed pattern segment `{segment}`: {reason}")]
    MalformedPattern { segment: String, reason: String },

    /// The path is empty or contains an empty segment.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Unregister traversal hit a segment that was never registered.
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// The path exists but the subscriber is not attached to it.
    #[error("Subscriber not found in registry")]
    SubscriberNotFound,

    /// The configured separator collides with segment text or pattern syntax.
    #[error("Invalid separator `{0}`: must not be alphanumeric, whitespace or pattern syntax")]
    InvalidSeparator(char),

    /// A dispatched topic contains pattern syntax.
    #[error("Invalid topic `{0}`: topics must not contain pattern characters")]
    InvalidTopic(String),
}

impl RouterError {
    pub(crate) fn malformed(segment: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPattern {
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for routing operations.
pub type RouterResult<T> = Result<T, RouterError>;
