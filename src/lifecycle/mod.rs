//! Lifecycle management for the `listen` loop.
//!
//! # Data Flow
//! ```text
//! Ctrl-C / stdin EOF → Shutdown::trigger → every subscriber of the
//! broadcast stops its loop → "Shutdown complete"
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
