//! Zero-cost logging helpers.
//!
//! With the `tracing` feature enabled these macros forward to the `tracing`
//! crate. Without it (the default) they expand to nothing, so the structural
//! events emitted by the bucket tree cost nothing in normal builds.
//!
//! ```bash
//! # Watch splits and collapses while running a test
//! RUST_LOG=bucketlist=trace cargo test --features tracing multi_level
//! ```

#![allow(unused_macros, unused_imports)]

/// Trace-level logging. Used for per-node structural events.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level logging. Used for whole-tree events (level changes, resets, growth).
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
