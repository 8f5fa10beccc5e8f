//! Runtime configuration for compiled workflows.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default ceiling on supersteps per invocation.
pub const DEFAULT_RECURSION_LIMIT: u32 = 25;

/// Execution knobs compiled into an [`App`](crate::app::App).
///
/// All checks driven from here happen *between* supersteps — a node that is
/// already running is never preempted.
///
/// # Examples
///
/// ```rust
/// use lockstep::runtimes::RuntimeConfig;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let cancel = CancellationToken::new();
/// let config = RuntimeConfig::default()
///     .with_recursion_limit(50)
///     .with_deadline(Duration::from_secs(30))
///     .with_cancellation(cancel.clone());
///
/// // Later, from anywhere: cancel.cancel();
/// ```
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Maximum number of supersteps before a run aborts with
    /// [`ExecutionError::RecursionLimit`](crate::runtimes::ExecutionError::RecursionLimit).
    /// Cycles are legal as long as they converge within this budget.
    pub recursion_limit: u32,
    /// Cap on concurrent node executions within one superstep. Defaults to
    /// the host's available parallelism.
    pub concurrency_limit: Option<usize>,
    /// Wall-clock budget for the whole run, measured from the first
    /// superstep and checked between supersteps.
    pub deadline: Option<Duration>,
    /// Cooperative cancellation signal, checked between supersteps.
    pub cancellation: Option<CancellationToken>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            concurrency_limit: None,
            deadline: None,
            cancellation: None,
        }
    }
}

impl RuntimeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the superstep ceiling.
    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Caps concurrent node executions per superstep.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Sets a wall-clock deadline for the run.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches a cancellation token; cancelling it aborts the run at the
    /// next superstep boundary.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Effective concurrency cap.
    #[must_use]
    pub fn effective_concurrency_limit(&self) -> usize {
        self.concurrency_limit.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_documented_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.recursion_limit, 25);
        assert!(config.deadline.is_none());
        assert!(config.cancellation.is_none());
        assert!(config.effective_concurrency_limit() >= 1);
    }

    #[test]
    fn builders_override_fields() {
        let config = RuntimeConfig::new()
            .with_recursion_limit(3)
            .with_concurrency_limit(2)
            .with_deadline(Duration::from_millis(10));
        assert_eq!(config.recursion_limit, 3);
        assert_eq!(config.effective_concurrency_limit(), 2);
        assert_eq!(config.deadline, Some(Duration::from_millis(10)));
    }
}
