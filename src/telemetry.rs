//! Tracing subscriber bootstrap.
//!
//! The engine logs through [`tracing`] everywhere; this module installs a
//! formatted subscriber for binaries and demos that do not bring their own.
//! Libraries embedding lockstep should configure their own subscriber and
//! skip this.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `info` for this crate.
///
/// Safe to call more than once; only the first installation wins.
pub fn init() {
    init_with_filter("lockstep=info");
}

/// Installs a global fmt subscriber with `default_filter` as the fallback
/// when `RUST_LOG` is unset.
pub fn init_with_filter(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
