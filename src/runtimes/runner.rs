//! The execution driver: superstep loop, frames, and run-time errors.
//!
//! [`AppRunner`] owns the scheduler loop shared by both entry points on
//! [`App`](crate::app::App): `invoke` runs it to completion, `stream` pulls
//! it one superstep per polled item. The step-wise surface (`seed_frame` +
//! `run_step`) is public so callers can interleave their own logic between
//! supersteps; after a failure the [`ExecutionFrame`] still holds the last
//! fully merged state, because merging only ever happens for fully
//! successful supersteps.

use futures_util::stream::{self, BoxStream, StreamExt};
use miette::Diagnostic;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::instrument;

use crate::app::App;
use crate::graphs::RoutingError;
use crate::node::{NodeError, NodePartial};
use crate::reducers::MergeError;
use crate::schedulers::{Scheduler, SchedulerError};
use crate::state::{StateSnapshot, WorkflowState};
use crate::types::NodeKind;

/// Lazy event sequence produced by [`App::stream`](crate::app::App::stream):
/// one [`StepReport`] per completed superstep, terminated by the first error
/// if the run fails. Single-pass and forward-only; dropping it abandons the
/// remaining supersteps.
pub type SuperstepStream = BoxStream<'static, Result<StepReport, ExecutionError>>;

/// In-flight execution context of one invocation.
///
/// Tracks the running state, the current frontier, and the superstep
/// counter. The frame stays inspectable after an error: run-time failures
/// surface before any of the failing superstep's deltas merge, so
/// [`state`](Self::state) is always a fully merged, consistent snapshot.
#[derive(Debug, Clone)]
pub struct ExecutionFrame {
    state: WorkflowState,
    frontier: Vec<NodeKind>,
    step: u64,
    started_at: Instant,
}

impl ExecutionFrame {
    /// The running state as of the last completed merge.
    #[must_use]
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Consumes the frame, yielding the state.
    #[must_use]
    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    /// The node ids scheduled for the next superstep.
    #[must_use]
    pub fn frontier(&self) -> &[NodeKind] {
        &self.frontier
    }

    /// Completed supersteps so far.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// `true` once the frontier is empty or holds only `End`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.frontier.is_empty() || self.frontier.iter().all(NodeKind::is_end)
    }
}

/// Observation of one completed superstep.
///
/// `writes` carries the pre-merge deltas (who wrote what), `state` the
/// post-merge snapshot, in case consumers want either view.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Superstep number (1-based).
    pub step: u64,
    /// Nodes that executed, in merge (registration) order.
    pub ran_nodes: Vec<NodeKind>,
    /// Sentinel frontier entries that were skipped.
    pub skipped_nodes: Vec<NodeKind>,
    /// Pre-merge deltas, aligned with `ran_nodes`.
    pub writes: Vec<(NodeKind, NodePartial)>,
    /// Fully merged state after this superstep.
    pub state: StateSnapshot,
    /// The frontier scheduled for the next superstep.
    pub next_frontier: Vec<NodeKind>,
    /// `true` when this was the final superstep of the run.
    pub completed: bool,
}

/// Run-time failures; each aborts the invocation immediately, with no retry
/// and no partial merge.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutionError {
    /// A node function failed; the whole superstep was discarded.
    #[error("node {node} failed at step {step}")]
    #[diagnostic(
        code(lockstep::runtimes::node_execution),
        help("No deltas from the failing superstep were merged.")
    )]
    NodeExecution {
        node: NodeKind,
        step: u64,
        #[source]
        source: NodeError,
    },

    /// A routing function returned a label missing from its mapping.
    #[error(transparent)]
    #[diagnostic(code(lockstep::runtimes::routing))]
    Routing(#[from] RoutingError),

    /// A reducer received incompatible accumulator/delta types.
    #[error(transparent)]
    #[diagnostic(code(lockstep::runtimes::merge))]
    Merge(#[from] MergeError),

    /// The superstep counter hit the configured ceiling with work remaining.
    #[error("recursion limit of {limit} supersteps exceeded with a non-empty frontier")]
    #[diagnostic(
        code(lockstep::runtimes::recursion_limit),
        help("Raise RuntimeConfig::recursion_limit or add a convergence condition to the cycle.")
    )]
    RecursionLimit { limit: u32 },

    /// The run's cancellation token fired.
    #[error("run cancelled after step {step}")]
    #[diagnostic(code(lockstep::runtimes::cancelled))]
    Cancelled { step: u64 },

    /// The run's wall-clock deadline passed.
    #[error("deadline exceeded after step {step}")]
    #[diagnostic(code(lockstep::runtimes::deadline))]
    DeadlineExceeded { step: u64 },

    /// A node task panicked or was aborted.
    #[error("node task join error: {0}")]
    #[diagnostic(code(lockstep::runtimes::join))]
    Join(#[source] JoinError),
}

impl From<SchedulerError> for ExecutionError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NodeRun { node, step, source } => {
                ExecutionError::NodeExecution { node, step, source }
            }
            SchedulerError::Join(source) => ExecutionError::Join(source),
        }
    }
}

/// Drives a compiled [`App`] through barrier-synchronized supersteps.
#[derive(Debug, Clone)]
pub struct AppRunner {
    app: Arc<App>,
    scheduler: Scheduler,
}

enum StreamState {
    Seed(WorkflowState),
    Running(ExecutionFrame),
    Done,
}

impl AppRunner {
    /// Creates a runner for `app`, sizing the scheduler from the app's
    /// runtime configuration.
    #[must_use]
    pub fn new(app: App) -> Self {
        let scheduler = Scheduler::new(app.runtime_config().effective_concurrency_limit());
        Self {
            app: Arc::new(app),
            scheduler,
        }
    }

    /// The app this runner executes.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Seeds an [`ExecutionFrame`]: the initial frontier is `Start`'s
    /// unconditional successors plus any conditional edges on `Start`,
    /// resolved against the initial state.
    pub fn seed_frame(
        &self,
        initial_state: WorkflowState,
    ) -> Result<ExecutionFrame, ExecutionError> {
        let frontier = self.app.initial_frontier(&initial_state.snapshot())?;
        tracing::debug!(frontier = ?frontier, "seeded initial frontier");
        Ok(ExecutionFrame {
            state: initial_state,
            frontier,
            step: 0,
            started_at: Instant::now(),
        })
    }

    /// Executes exactly one superstep against `frame`.
    ///
    /// On a terminal frame this is a no-op returning a completed, empty
    /// report. Otherwise the between-superstep checks run first —
    /// cancellation, deadline, recursion limit, in that order — then the
    /// frontier executes, the barrier merges, and the next frontier is
    /// resolved against the merged state.
    ///
    /// Any error leaves `frame` exactly as the last successful superstep
    /// left it.
    #[instrument(skip(self, frame), fields(step = frame.step + 1), err)]
    pub async fn run_step(&self, frame: &mut ExecutionFrame) -> Result<StepReport, ExecutionError> {
        if frame.is_terminal() {
            return Ok(StepReport {
                step: frame.step,
                ran_nodes: Vec::new(),
                skipped_nodes: frame.frontier.clone(),
                writes: Vec::new(),
                state: frame.state.snapshot(),
                next_frontier: Vec::new(),
                completed: true,
            });
        }

        let config = self.app.runtime_config();
        if let Some(token) = &config.cancellation {
            if token.is_cancelled() {
                return Err(ExecutionError::Cancelled { step: frame.step });
            }
        }
        if let Some(deadline) = config.deadline {
            if frame.started_at.elapsed() >= deadline {
                return Err(ExecutionError::DeadlineExceeded { step: frame.step });
            }
        }
        if frame.step >= u64::from(config.recursion_limit) {
            return Err(ExecutionError::RecursionLimit {
                limit: config.recursion_limit,
            });
        }

        let step = frame.step + 1;
        let snapshot = frame.state.snapshot();
        let outcome = self
            .scheduler
            .superstep(self.app.nodes(), &frame.frontier, snapshot, step)
            .await?;

        // Merge into a scratch copy; the frame only ever sees fully merged
        // supersteps.
        let mut merged = frame.state.clone();
        self.app.apply_barrier(&mut merged, &outcome.outputs)?;

        let post_merge = merged.snapshot();
        let next_frontier = self
            .app
            .resolve_next_frontier(&outcome.ran_nodes, &post_merge)?;

        frame.state = merged;
        frame.frontier = next_frontier.clone();
        frame.step = step;

        let completed = frame.is_terminal();
        tracing::debug!(step, next_frontier = ?next_frontier, completed, "superstep merged");

        Ok(StepReport {
            step,
            ran_nodes: outcome.ran_nodes,
            skipped_nodes: outcome.skipped_nodes,
            writes: outcome.outputs,
            state: post_merge,
            next_frontier,
            completed,
        })
    }

    /// Runs supersteps until the frontier is terminal; returns the final
    /// merged state.
    #[instrument(skip(self, initial_state), err)]
    pub async fn run_until_complete(
        &self,
        initial_state: WorkflowState,
    ) -> Result<WorkflowState, ExecutionError> {
        let mut frame = self.seed_frame(initial_state)?;
        while !frame.is_terminal() {
            self.run_step(&mut frame).await?;
        }
        tracing::info!(steps = frame.step, "workflow run completed");
        Ok(frame.into_state())
    }

    /// Consumes the runner into a pull-based superstep stream.
    ///
    /// Each polled item executes one superstep; nothing runs between polls,
    /// so dropping the stream abandons the rest of the run.
    #[must_use]
    pub fn into_stream(self, initial_state: WorkflowState) -> SuperstepStream {
        stream::unfold(
            (self, StreamState::Seed(initial_state)),
            |(runner, st)| async move {
                match st {
                    StreamState::Done => None,
                    StreamState::Seed(initial) => match runner.seed_frame(initial) {
                        Ok(frame) => Self::advance(runner, frame).await,
                        Err(err) => Some((Err(err), (runner, StreamState::Done))),
                    },
                    StreamState::Running(frame) => Self::advance(runner, frame).await,
                }
            },
        )
        .boxed()
    }

    /// One stream iteration: run a superstep, decide whether more follow.
    async fn advance(
        runner: AppRunner,
        mut frame: ExecutionFrame,
    ) -> Option<(
        Result<StepReport, ExecutionError>,
        (AppRunner, StreamState),
    )> {
        if frame.is_terminal() {
            return None;
        }
        match runner.run_step(&mut frame).await {
            Ok(report) => {
                let next = if report.completed {
                    StreamState::Done
                } else {
                    StreamState::Running(frame)
                };
                Some((Ok(report), (runner, next)))
            }
            Err(err) => Some((Err(err), (runner, StreamState::Done))),
        }
    }
}
