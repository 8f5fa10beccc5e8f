//! GraphBuilder: the mutable draft accumulated before compilation.
//!
//! The builder is a plain value — no global registry, one builder instance
//! per graph under construction. It records nodes (and their registration
//! order, which later serves as the merge tie-break), unconditional edges,
//! and conditional edge records. Everything except duplicate/reserved node
//! ids is validated at [`compile`](GraphBuilder::compile) time, since nodes
//! and edges may be added in any order.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::edges::{ConditionalEdge, RouterFn};
use crate::node::Node;
use crate::reducers::StateSchema;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Builder for workflow graphs.
///
/// # Examples
///
/// ```rust
/// use lockstep::graphs::GraphBuilder;
/// use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
/// use lockstep::reducers::StateSchema;
/// use lockstep::state::StateSnapshot;
/// use lockstep::types::NodeKind;
/// use async_trait::async_trait;
///
/// struct Worker;
///
/// #[async_trait]
/// impl Node for Worker {
///     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
///         Ok(NodePartial::default())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let app = GraphBuilder::new()
///     .add_node("worker", Worker)?
///     .add_edge(NodeKind::Start, "worker")
///     .add_edge("worker", NodeKind::End)
///     .with_schema(StateSchema::new())
///     .compile()?;
/// # Ok(())
/// # }
/// ```
pub struct GraphBuilder {
    pub(crate) nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    pub(crate) node_order: Vec<NodeKind>,
    pub(crate) edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    pub(crate) conditional_edges: Vec<ConditionalEdge>,
    pub(crate) schema: StateSchema,
    pub(crate) runtime_config: RuntimeConfig,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.node_order)
            .field("node_order", &self.node_order)
            .field("edges", &self.edges)
            .field("conditional_edges", &self.conditional_edges.len())
            .field("schema", &self.schema)
            .field("runtime_config", &self.runtime_config)
            .finish()
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            node_order: Vec::new(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            schema: StateSchema::default(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Registers a node under a unique identifier.
    ///
    /// Registration order is significant: when two nodes of the same
    /// superstep write the same key through a non-commutative reducer, their
    /// deltas merge in registration order.
    ///
    /// # Errors
    ///
    /// [`BuildError::DuplicateNode`] when `id` is already registered and
    /// [`BuildError::ReservedId`] for the `Start`/`End` sentinels, which are
    /// usable only as edge endpoints.
    pub fn add_node(
        mut self,
        id: impl Into<NodeKind>,
        node: impl Node + 'static,
    ) -> Result<Self, BuildError> {
        let id = id.into();
        if id.is_sentinel() {
            return Err(BuildError::ReservedId { id });
        }
        if self.nodes.contains_key(&id) {
            return Err(BuildError::DuplicateNode { id });
        }
        self.node_order.push(id.clone());
        self.nodes.insert(id, Arc::new(node));
        Ok(self)
    }

    /// Adds an unconditional edge.
    ///
    /// Endpoint existence is deliberately not checked here — nodes may be
    /// registered after the edges that reference them. Compile validates.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeKind>, to: impl Into<NodeKind>) -> Self {
        self.edges.entry(from.into()).or_default().push(to.into());
        self
    }

    /// Adds a conditional edge: when `from` has run, `router` inspects the
    /// merged state and returns a label looked up in `mapping`.
    ///
    /// The mapping must end up non-empty and its targets registered; both are
    /// checked at compile time.
    #[must_use]
    pub fn add_conditional_edges<L, T>(
        mut self,
        from: impl Into<NodeKind>,
        router: RouterFn,
        mapping: impl IntoIterator<Item = (L, T)>,
    ) -> Self
    where
        L: Into<String>,
        T: Into<NodeKind>,
    {
        let targets: BTreeMap<String, NodeKind> = mapping
            .into_iter()
            .map(|(label, target)| (label.into(), target.into()))
            .collect();
        self.conditional_edges
            .push(ConditionalEdge::new(from.into(), router, targets));
        self
    }

    /// Declares the state schema (per-key reducers) for the compiled graph.
    #[must_use]
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Overrides the runtime configuration (recursion limit, concurrency
    /// cap, deadline, cancellation).
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}

/// Errors raised while accumulating the draft graph.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A node id was registered twice.
    #[error("node id {id} is already registered")]
    #[diagnostic(
        code(lockstep::graphs::duplicate_node),
        help("Node ids must be unique within a graph.")
    )]
    DuplicateNode { id: NodeKind },

    /// An attempt to register the Start/End sentinels as executable nodes.
    #[error("{id} is a reserved sentinel and cannot be registered as a node")]
    #[diagnostic(
        code(lockstep::graphs::reserved_id),
        help("Start and End may only appear as edge endpoints.")
    )]
    ReservedId { id: NodeKind },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeContext, NodeError, NodePartial};
    use crate::state::StateSnapshot;
    use async_trait::async_trait;

    #[derive(Debug, Clone)]
    struct NoopNode;

    #[async_trait]
    impl Node for NoopNode {
        async fn run(
            &self,
            _snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<NodePartial, NodeError> {
            Ok(NodePartial::default())
        }
    }

    #[test]
    fn add_node_records_registration_order() {
        let gb = GraphBuilder::new()
            .add_node("b", NoopNode)
            .unwrap()
            .add_node("a", NoopNode)
            .unwrap();
        assert_eq!(
            gb.node_order,
            vec![NodeKind::Custom("b".into()), NodeKind::Custom("a".into())]
        );
    }

    #[test]
    fn add_node_rejects_duplicates() {
        let err = GraphBuilder::new()
            .add_node("a", NoopNode)
            .unwrap()
            .add_node("a", NoopNode)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateNode {
                id: NodeKind::Custom("a".into())
            }
        );
    }

    #[test]
    fn add_node_rejects_sentinels() {
        let err = GraphBuilder::new().add_node(NodeKind::Start, NoopNode).unwrap_err();
        assert_eq!(err, BuildError::ReservedId { id: NodeKind::Start });
        let err = GraphBuilder::new().add_node(NodeKind::End, NoopNode).unwrap_err();
        assert_eq!(err, BuildError::ReservedId { id: NodeKind::End });
    }

    #[test]
    fn add_edge_accumulates_without_validation() {
        let gb = GraphBuilder::new()
            .add_edge(NodeKind::Start, "ghost")
            .add_edge(NodeKind::Start, NodeKind::End);
        let outs = gb.edges.get(&NodeKind::Start).unwrap();
        assert_eq!(outs.len(), 2);
    }

    #[test]
    fn add_conditional_edges_stores_one_record() {
        let router: RouterFn = Arc::new(|_| "yes".to_string());
        let gb = GraphBuilder::new().add_conditional_edges(
            "src",
            router,
            [("yes", "a"), ("no", "b")],
        );
        assert_eq!(gb.conditional_edges.len(), 1);
        let edge = &gb.conditional_edges[0];
        assert_eq!(edge.from(), &NodeKind::Custom("src".into()));
        assert_eq!(edge.targets().len(), 2);
    }
}
