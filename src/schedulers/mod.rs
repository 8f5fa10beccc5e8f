//! Concurrent superstep execution.
//!
//! The [`Scheduler`] runs one frontier as a batch of tokio tasks: every
//! runnable node gets its own clone of the pre-superstep [`StateSnapshot`],
//! executions fan out up to a concurrency cap, and a barrier join collects
//! every result before anything else happens. No node observes a sibling's
//! output mid-superstep.
//!
//! Failure is atomic: if any node errs, the whole superstep aborts and none
//! of its deltas reach the merge phase. When several nodes fail in the same
//! step, the one earliest in registration order is reported, keeping the
//! surfaced error deterministic.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{instrument, Instrument};

use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Runs frontiers of nodes as barrier-synchronized batches.
#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency_limit: usize,
}

/// Result of one superstep's execution phase (pre-merge).
#[derive(Debug, Clone, Default)]
pub struct SuperstepOutcome {
    /// Nodes that executed, in registration order. This is also the order
    /// their deltas merge in.
    pub ran_nodes: Vec<NodeKind>,
    /// Sentinel frontier entries that were skipped rather than executed.
    pub skipped_nodes: Vec<NodeKind>,
    /// One delta per ran node, aligned with `ran_nodes`.
    pub outputs: Vec<(NodeKind, NodePartial)>,
}

/// Errors from executing a superstep.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// A node execution returned an error; its delta and every sibling delta
    /// from the same superstep are discarded.
    #[error("node {node} failed at step {step}")]
    #[diagnostic(
        code(lockstep::schedulers::node_run),
        help("The failing node's own error is attached as the source.")
    )]
    NodeRun {
        node: NodeKind,
        step: u64,
        #[source]
        source: NodeError,
    },

    /// A node task panicked or was aborted.
    #[error("node task join error: {0}")]
    #[diagnostic(code(lockstep::schedulers::join))]
    Join(#[from] JoinError),
}

impl Scheduler {
    /// Creates a scheduler that runs at most `concurrency_limit` node
    /// executions at once. A limit of zero is clamped to one.
    #[must_use]
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    /// The configured concurrency cap.
    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Executes one superstep.
    ///
    /// `frontier` must already be ordered by node registration (the runner
    /// guarantees this); duplicates are executed at most once and sentinels
    /// are skipped. Each node runs against its own clone of `snapshot`.
    ///
    /// Returns all per-node deltas in registration order, or the first
    /// failure (by that same order) with nothing merged.
    #[instrument(skip(self, nodes, snapshot), fields(frontier_len = frontier.len()), err)]
    pub async fn superstep(
        &self,
        nodes: &FxHashMap<NodeKind, Arc<dyn Node>>,
        frontier: &[NodeKind],
        snapshot: StateSnapshot,
        step: u64,
    ) -> Result<SuperstepOutcome, SchedulerError> {
        let mut seen: FxHashSet<&NodeKind> = FxHashSet::default();
        let mut runnable: Vec<NodeKind> = Vec::new();
        let mut skipped: Vec<NodeKind> = Vec::new();
        for id in frontier {
            if !seen.insert(id) {
                continue;
            }
            if id.is_sentinel() {
                skipped.push(id.clone());
            } else {
                runnable.push(id.clone());
            }
        }

        if runnable.is_empty() {
            return Ok(SuperstepOutcome {
                ran_nodes: Vec::new(),
                skipped_nodes: skipped,
                outputs: Vec::new(),
            });
        }

        tracing::debug!(step, nodes = runnable.len(), "executing superstep batch");

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut join_set: JoinSet<(usize, Result<NodePartial, NodeError>)> = JoinSet::new();
        for (index, id) in runnable.iter().enumerate() {
            let node = Arc::clone(
                nodes
                    .get(id)
                    .expect("compile guarantees every frontier node is registered"),
            );
            let ctx = NodeContext {
                node_id: id.to_string(),
                step,
            };
            let task_snapshot = snapshot.clone();
            let semaphore = Arc::clone(&semaphore);
            let span = ctx.span();
            join_set.spawn(
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("superstep semaphore is never closed");
                    (index, node.run(task_snapshot, ctx).await)
                }
                .instrument(span),
            );
        }

        // Barrier: every execution finishes before any result is interpreted.
        let mut results: Vec<Option<Result<NodePartial, NodeError>>> =
            (0..runnable.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, result) = joined?;
            results[index] = Some(result);
        }

        let mut outputs: Vec<(NodeKind, NodePartial)> = Vec::with_capacity(runnable.len());
        for (id, result) in runnable.iter().zip(results) {
            let result = result.expect("every spawned node task reports exactly once");
            match result {
                Ok(partial) => outputs.push((id.clone(), partial)),
                Err(source) => {
                    return Err(SchedulerError::NodeRun {
                        node: id.clone(),
                        step,
                        source,
                    });
                }
            }
        }

        Ok(SuperstepOutcome {
            ran_nodes: runnable,
            skipped_nodes: skipped,
            outputs,
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        let limit = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct EchoNode {
        key: &'static str,
        value: &'static str,
    }

    #[async_trait]
    impl Node for EchoNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<NodePartial, NodeError> {
            Ok(NodePartial::new().with_update(self.key, json!(self.value)))
        }
    }

    #[derive(Debug)]
    struct FailNode;

    #[async_trait]
    impl Node for FailNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<NodePartial, NodeError> {
            Err(NodeError::ValidationFailed("boom".into()))
        }
    }

    struct CountingNode {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Node for CountingNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<NodePartial, NodeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(NodePartial::default())
        }
    }

    fn registry_of(entries: Vec<(&str, Arc<dyn Node>)>) -> FxHashMap<NodeKind, Arc<dyn Node>> {
        entries
            .into_iter()
            .map(|(name, node)| (NodeKind::Custom(name.into()), node))
            .collect()
    }

    #[tokio::test]
    async fn outputs_follow_frontier_order() {
        let nodes = registry_of(vec![
            ("a", Arc::new(EchoNode { key: "ka", value: "va" })),
            ("b", Arc::new(EchoNode { key: "kb", value: "vb" })),
        ]);
        let frontier = vec![NodeKind::Custom("a".into()), NodeKind::Custom("b".into())];
        let scheduler = Scheduler::new(4);
        let outcome = scheduler
            .superstep(&nodes, &frontier, StateSnapshot::default(), 1)
            .await
            .unwrap();

        assert_eq!(outcome.ran_nodes, frontier);
        assert_eq!(outcome.outputs.len(), 2);
        assert_eq!(outcome.outputs[0].0, frontier[0]);
        assert_eq!(outcome.outputs[1].0, frontier[1]);
    }

    #[tokio::test]
    async fn duplicate_frontier_entries_run_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let nodes = registry_of(vec![(
            "dup",
            Arc::new(CountingNode {
                runs: Arc::clone(&runs),
            }),
        )]);
        let frontier = vec![
            NodeKind::Custom("dup".into()),
            NodeKind::Custom("dup".into()),
            NodeKind::Custom("dup".into()),
        ];
        Scheduler::new(2)
            .superstep(&nodes, &frontier, StateSnapshot::default(), 1)
            .await
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sentinels_are_skipped_not_run() {
        let nodes = registry_of(vec![("a", Arc::new(EchoNode { key: "k", value: "v" }))]);
        let frontier = vec![NodeKind::Custom("a".into()), NodeKind::End];
        let outcome = Scheduler::new(1)
            .superstep(&nodes, &frontier, StateSnapshot::default(), 1)
            .await
            .unwrap();
        assert_eq!(outcome.ran_nodes, vec![NodeKind::Custom("a".into())]);
        assert_eq!(outcome.skipped_nodes, vec![NodeKind::End]);
    }

    #[tokio::test]
    async fn first_failure_in_order_wins() {
        let nodes = registry_of(vec![
            ("ok", Arc::new(EchoNode { key: "k", value: "v" })),
            ("bad", Arc::new(FailNode)),
        ]);
        let frontier = vec![NodeKind::Custom("ok".into()), NodeKind::Custom("bad".into())];
        let err = Scheduler::new(4)
            .superstep(&nodes, &frontier, StateSnapshot::default(), 3)
            .await
            .unwrap_err();
        match err {
            SchedulerError::NodeRun { node, step, .. } => {
                assert_eq!(node, NodeKind::Custom("bad".into()));
                assert_eq!(step, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
