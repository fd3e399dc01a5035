//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::path::{is_valid_separator, DEFAULT_SEPARATOR};
use crate::routing::{RouterError, RouterResult};

/// Root configuration for the `topic-router` binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Router behaviour.
    pub router: RouterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static subscriptions registered at startup.
    pub routes: Vec<RouteConfig>,
}

/// Router behaviour shared by every `Subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Hierarchy separator between segments.
    pub separator: char,

    /// Attach a backtrace to subscriber panic diagnostics.
    pub capture_backtraces: bool,

    /// Report subscriber `Err` returns to the tracer (panics are always reported).
    pub trace_subscriber_errors: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            capture_backtraces: true,
            trace_subscriber_errors: true,
        }
    }
}

impl RouterConfig {
    /// Check the settings a `Subscription` cannot work with.
    pub fn validate(&self) -> RouterResult<()> {
        if is_valid_separator(self.separator) {
            Ok(())
        } else {
            Err(RouterError::InvalidSeparator(self.separator))
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// A static subscription.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Pattern to register.
    pub pattern: String,

    /// Where matched messages go.
    #[serde(default)]
    pub sink: SinkKind,
}

/// Delivery target for a static subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// One JSON line per delivery on stdout.
    #[default]
    Stdout,
    /// A `tracing` INFO event per delivery.
    Log,
}
