//! The compiled, executable workflow graph.
//!
//! [`App`] is the immutable product of
//! [`GraphBuilder::compile`](crate::graphs::GraphBuilder::compile): node
//! registry plus registration order, adjacency lists, conditional edges, the
//! frozen reducer table, and runtime configuration. It owns the two
//! execution entry points — [`invoke`](App::invoke) (run to completion) and
//! [`stream`](App::stream) (observe each superstep) — both layered over the
//! same scheduler loop in [`runtimes`](crate::runtimes).

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

use crate::graphs::{ConditionalEdge, RoutingError};
use crate::node::{Node, NodePartial};
use crate::reducers::{MergeError, ReducerRegistry};
use crate::runtimes::{AppRunner, ExecutionError, RuntimeConfig, SuperstepStream};
use crate::state::{StateSnapshot, WorkflowState};
use crate::types::NodeKind;

/// An immutable, executable workflow graph.
///
/// Cheap to clone (node implementations are shared through `Arc`); a single
/// `App` can drive any number of concurrent invocations, each with its own
/// fresh state.
///
/// # Examples
///
/// ```rust,no_run
/// use lockstep::graphs::GraphBuilder;
/// use lockstep::state::WorkflowState;
/// use lockstep::types::NodeKind;
/// # use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
/// # use lockstep::state::StateSnapshot;
/// # use async_trait::async_trait;
/// # struct Step;
/// # #[async_trait]
/// # impl Node for Step {
/// #     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
/// #         Ok(NodePartial::default())
/// #     }
/// # }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = GraphBuilder::new()
///     .add_node("step", Step)?
///     .add_edge(NodeKind::Start, "step")
///     .add_edge("step", NodeKind::End)
///     .compile()?;
///
/// let final_state = app.invoke(WorkflowState::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    node_order: Vec<NodeKind>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    conditional_edges: Vec<ConditionalEdge>,
    reducers: ReducerRegistry,
    runtime_config: RuntimeConfig,
}

impl App {
    /// Internal (crate) factory keeping the fields private; only
    /// `GraphBuilder::compile` constructs apps.
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        node_order: Vec<NodeKind>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        conditional_edges: Vec<ConditionalEdge>,
        reducers: ReducerRegistry,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            nodes,
            node_order,
            edges,
            conditional_edges,
            reducers,
            runtime_config,
        }
    }

    /// The node registry.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// Node ids in registration order — the deterministic merge tie-break.
    #[must_use]
    pub fn node_order(&self) -> &[NodeKind] {
        &self.node_order
    }

    /// Unconditional adjacency lists.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    /// The conditional edge records.
    #[must_use]
    pub fn conditional_edges(&self) -> &[ConditionalEdge] {
        &self.conditional_edges
    }

    /// The frozen per-key reducer table.
    #[must_use]
    pub fn reducers(&self) -> &ReducerRegistry {
        &self.reducers
    }

    /// The runtime configuration compiled into this app.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// Run the workflow to completion and return the final merged state.
    ///
    /// Supersteps execute until the frontier is empty or holds only `End`.
    /// Any run-time failure (node error, unmapped routing label, merge type
    /// mismatch, recursion limit, cancellation, deadline) aborts the run and
    /// is returned unchanged; nothing is retried.
    #[instrument(skip(self, initial_state), err)]
    pub async fn invoke(
        &self,
        initial_state: WorkflowState,
    ) -> Result<WorkflowState, ExecutionError> {
        AppRunner::new(self.clone())
            .run_until_complete(initial_state)
            .await
    }

    /// Run the workflow as a lazy stream of per-superstep events.
    ///
    /// Execution is driven by consumption: each polled item runs exactly one
    /// superstep and yields its [`StepReport`](crate::runtimes::StepReport)
    /// — the nodes that ran mapped to their pre-merge deltas, plus the merged
    /// snapshot and next frontier. Dropping the stream abandons the remaining
    /// supersteps; there is no background task to leak.
    ///
    /// On failure the stream yields the error as its final item and then
    /// terminates; events already yielded remain valid observations.
    #[must_use]
    pub fn stream(&self, initial_state: WorkflowState) -> SuperstepStream {
        AppRunner::new(self.clone()).into_stream(initial_state)
    }

    /// Position of `id` in registration order, used to sort frontiers.
    /// Sentinels order after all registered nodes, `End` last.
    pub(crate) fn registration_index(&self, id: &NodeKind) -> usize {
        match id {
            NodeKind::End => usize::MAX,
            NodeKind::Start => usize::MAX - 1,
            custom => self
                .node_order
                .iter()
                .position(|n| n == custom)
                .unwrap_or(usize::MAX - 2),
        }
    }

    /// The frontier seeded from `Start`: its unconditional successors plus
    /// any conditional edges on `Start` resolved against the initial state.
    pub(crate) fn initial_frontier(
        &self,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<NodeKind>, RoutingError> {
        self.resolve_next_frontier(std::slice::from_ref(&NodeKind::Start), snapshot)
    }

    /// Computes the next frontier after the nodes in `ran` completed a
    /// superstep: the union of every ran node's unconditional successors and
    /// resolved conditional targets, deduplicated and ordered by node
    /// registration (sentinels last).
    pub(crate) fn resolve_next_frontier(
        &self,
        ran: &[NodeKind],
        snapshot: &StateSnapshot,
    ) -> Result<Vec<NodeKind>, RoutingError> {
        let mut seen: FxHashSet<NodeKind> = FxHashSet::default();
        let mut next: Vec<NodeKind> = Vec::new();

        for id in ran {
            if let Some(targets) = self.edges.get(id) {
                for target in targets {
                    if seen.insert(target.clone()) {
                        next.push(target.clone());
                    }
                }
            }
            for edge in self.conditional_edges.iter().filter(|e| e.from() == id) {
                let target = edge.resolve(snapshot)?;
                tracing::debug!(from = %id, to = %target, "conditional edge routed");
                if seen.insert(target.clone()) {
                    next.push(target);
                }
            }
        }

        next.sort_by_key(|id| self.registration_index(id));
        Ok(next)
    }

    /// Merge phase of one superstep: applies each ran node's delta to the
    /// running state through the reducer table.
    ///
    /// `writes` must already be in registration order (the scheduler
    /// guarantees it); that order is the tie-break when two nodes of the same
    /// superstep wrote one key through a non-commutative reducer. Within a
    /// delta, keys merge in the delta's own ordered-map order.
    #[instrument(skip(self, state, writes), fields(nodes = writes.len()), err)]
    pub(crate) fn apply_barrier(
        &self,
        state: &mut WorkflowState,
        writes: &[(NodeKind, NodePartial)],
    ) -> Result<(), MergeError> {
        for (id, partial) in writes {
            if partial.is_empty() {
                continue;
            }
            tracing::debug!(node = %id, keys = partial.len(), "merging node delta");
            self.reducers.apply(state, partial)?;
        }
        Ok(())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("node_order", &self.node_order)
            .field("edges", &self.edges)
            .field("conditional_edges", &self.conditional_edges)
            .field("reducers", &self.reducers)
            .finish_non_exhaustive()
    }
}

// Structural equality: equal drafts compile to equal apps. Node
// implementations and routing/combine closures are outside the comparison;
// conditional edges compare by source and mapping, reducers by kind.
impl PartialEq for App {
    fn eq(&self, other: &Self) -> bool {
        self.node_order == other.node_order
            && self.edges == other.edges
            && self.conditional_edges == other.conditional_edges
            && self.reducers == other.reducers
    }
}
