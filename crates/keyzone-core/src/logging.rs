#![forbid(unsafe_code)]

//! Logging facade.
//!
//! With the `tracing` feature the standard `tracing` macros are re-exported.
//! Without it, crate-internal call sites compile against no-op stand-ins so
//! that instrumentation never needs its own `cfg` guard.
//!
//! The `tracing-json` feature adds [`init_json`], a one-call subscriber setup
//! that writes JSON lines filtered by `RUST_LOG`.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use trace;

/// Install a global JSON subscriber honoring `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json() -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}
