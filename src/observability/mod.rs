//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router operations produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters through the metrics facade)
//!     → tracer.rs (diagnostic payloads for dispatch failures)
//! ```
//!
//! # Design Decisions
//! - Dispatch failures never reach the caller; the tracer is the only channel
//! - A router without a tracer silently drops diagnostics
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
pub mod tracer;

pub use tracer::{LogTracer, MemoryTracer, Tracer};
