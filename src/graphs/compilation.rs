//! Graph compilation: validation and freeze into an executable [`App`].
//!
//! `compile()` is where every deferred structural check happens. It is
//! side-effect-free and deterministic: compiling two equal drafts yields
//! structurally equal apps.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::app::App;
use crate::reducers::ReducerRegistry;
use crate::types::NodeKind;

use super::builder::GraphBuilder;

impl GraphBuilder {
    /// Validates the draft graph and freezes it into an executable [`App`].
    ///
    /// Checks, in order:
    /// 1. every unconditional edge endpoint and every conditional source /
    ///    mapping target names a registered node or a sentinel;
    /// 2. every conditional mapping is non-empty;
    /// 3. `Start` has at least one outgoing edge;
    /// 4. every registered node has at least one outgoing edge (nodes wired
    ///    straight to `End` qualify);
    /// 5. every registered node is reachable forward from `Start`, counting
    ///    both unconditional edges and all conditional mapping targets.
    ///
    /// # Errors
    ///
    /// The first failed check is returned as a [`ValidationError`] naming the
    /// offending node or label.
    pub fn compile(self) -> Result<App, ValidationError> {
        let registered = |id: &NodeKind| id.is_sentinel() || self.nodes.contains_key(id);

        // 1. Dangling endpoints. Sources are visited in a deterministic
        // order: Start, End, then registration order, then anything left.
        let start = NodeKind::Start;
        let end = NodeKind::End;
        let mut sources: Vec<&NodeKind> = vec![&start, &end];
        sources.extend(self.node_order.iter());
        for from in sources {
            if let Some(targets) = self.edges.get(from) {
                for to in targets {
                    if !registered(to) {
                        return Err(ValidationError::UnknownEdgeEndpoint { id: to.clone() });
                    }
                }
            }
        }
        for from in self.edges.keys() {
            if !registered(from) {
                return Err(ValidationError::UnknownEdgeEndpoint { id: from.clone() });
            }
        }

        for edge in &self.conditional_edges {
            if !registered(edge.from()) {
                return Err(ValidationError::UnknownEdgeEndpoint {
                    id: edge.from().clone(),
                });
            }
            // 2. Non-empty mappings.
            if edge.targets().is_empty() {
                return Err(ValidationError::EmptyConditionalMapping {
                    from: edge.from().clone(),
                });
            }
            for (label, target) in edge.targets() {
                if !registered(target) {
                    return Err(ValidationError::UnknownRouteTarget {
                        from: edge.from().clone(),
                        label: label.clone(),
                        id: target.clone(),
                    });
                }
            }
        }

        // 3. Start must lead somewhere.
        if self.successors(&NodeKind::Start).is_empty() {
            return Err(ValidationError::MissingStartEdge);
        }

        // 4. No dead ends among registered nodes.
        for id in &self.node_order {
            if self.successors(id).is_empty() {
                return Err(ValidationError::DeadEnd { id: id.clone() });
            }
        }

        // 5. Forward reachability from Start. End is terminal and never
        // expanded, so edges out of it cannot make a node reachable.
        let mut visited: FxHashSet<NodeKind> = FxHashSet::default();
        let mut queue: Vec<NodeKind> = vec![NodeKind::Start];
        while let Some(current) = queue.pop() {
            if !visited.insert(current.clone()) || current.is_end() {
                continue;
            }
            queue.extend(self.successors(&current));
        }
        for id in &self.node_order {
            if !visited.contains(id) {
                return Err(ValidationError::Unreachable { id: id.clone() });
            }
        }

        let reducers = ReducerRegistry::from_schema(&self.schema);
        Ok(App::from_parts(
            self.nodes,
            self.node_order,
            self.edges,
            self.conditional_edges,
            reducers,
            self.runtime_config,
        ))
    }

    /// All successors of `id`: unconditional targets plus every conditional
    /// mapping target.
    fn successors(&self, id: &NodeKind) -> Vec<NodeKind> {
        let mut out: Vec<NodeKind> = self.edges.get(id).cloned().unwrap_or_default();
        for edge in self.conditional_edges.iter().filter(|e| e.from() == id) {
            out.extend(edge.targets().values().cloned());
        }
        out
    }
}

/// Structural problems detected at compile time.
///
/// Compilation fails fast on the first problem; nothing executes before a
/// draft graph passes every check.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An edge references an id that is neither registered nor a sentinel.
    #[error("edge references unknown node {id}")]
    #[diagnostic(
        code(lockstep::graphs::unknown_endpoint),
        help("Register the node with add_node before compiling.")
    )]
    UnknownEdgeEndpoint { id: NodeKind },

    /// A conditional mapping entry points at an unregistered node.
    #[error("conditional edge from {from} maps label \"{label}\" to unknown node {id}")]
    #[diagnostic(code(lockstep::graphs::unknown_route_target))]
    UnknownRouteTarget {
        from: NodeKind,
        label: String,
        id: NodeKind,
    },

    /// A conditional edge was added with an empty mapping.
    #[error("conditional edge from {from} has an empty mapping")]
    #[diagnostic(
        code(lockstep::graphs::empty_conditional_mapping),
        help("A conditional edge needs at least one label → target entry.")
    )]
    EmptyConditionalMapping { from: NodeKind },

    /// Start has no outgoing edges, so no frontier could ever form.
    #[error("Start has no outgoing edges")]
    #[diagnostic(
        code(lockstep::graphs::missing_start_edge),
        help("Add at least one edge from NodeKind::Start.")
    )]
    MissingStartEdge,

    /// A registered node cannot be reached from Start.
    #[error("node {id} is unreachable from Start")]
    #[diagnostic(code(lockstep::graphs::unreachable))]
    Unreachable { id: NodeKind },

    /// A registered node has no outgoing edges at all.
    #[error("node {id} has no outgoing edges")]
    #[diagnostic(
        code(lockstep::graphs::dead_end),
        help("Wire the node onward, or directly to NodeKind::End.")
    )]
    DeadEnd { id: NodeKind },
}
