//! Execution runtime: configuration, frames, and the superstep driver.
//!
//! - [`AppRunner`] — drives a compiled app superstep by superstep
//! - [`ExecutionFrame`] — per-invocation state, frontier, and step counter
//! - [`StepReport`] — what one superstep ran and wrote
//! - [`RuntimeConfig`] — recursion limit, concurrency cap, deadline,
//!   cancellation
//! - [`ExecutionError`] — every way a run can fail at run time
//!
//! Most callers only touch [`App::invoke`](crate::app::App::invoke) and
//! [`App::stream`](crate::app::App::stream); the runner surface is for
//! step-wise control.

pub mod runner;
pub mod runtime_config;

pub use runner::{AppRunner, ExecutionError, ExecutionFrame, StepReport, SuperstepStream};
pub use runtime_config::{RuntimeConfig, DEFAULT_RECURSION_LIMIT};
