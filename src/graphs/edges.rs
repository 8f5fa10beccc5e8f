//! Edge types and conditional routing.
//!
//! Unconditional edges live as adjacency lists on the builder/compiled graph;
//! this module holds the conditional variant: a routing function that
//! inspects the state and returns a *label*, resolved through an explicit
//! label→target mapping. An unmapped label is always a [`RoutingError`] —
//! never silently ignored — because a dropped route would break the
//! deterministic-flow guarantee.

use miette::Diagnostic;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Routing function for conditional edges.
///
/// Consumes the state as it stands *after* the source node's superstep merged
/// and returns a label; the label must be a key of the edge's mapping.
///
/// # Examples
///
/// ```rust
/// use lockstep::graphs::RouterFn;
/// use std::sync::Arc;
///
/// let classify: RouterFn = Arc::new(|snapshot| {
///     let text = snapshot.get("text").and_then(|v| v.as_str()).unwrap_or("");
///     if text.contains('?') {
///         "question".to_string()
///     } else {
///         "other".to_string()
///     }
/// });
/// ```
pub type RouterFn = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync + 'static>;

/// A conditional edge: source node, routing function, label→target mapping.
///
/// Built through
/// [`GraphBuilder::add_conditional_edges`](crate::graphs::GraphBuilder::add_conditional_edges);
/// the mapping's non-emptiness and target existence are verified at compile
/// time, label totality lazily at the moment a label is produced.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeKind,
    router: RouterFn,
    targets: BTreeMap<String, NodeKind>,
}

impl ConditionalEdge {
    /// Creates a conditional edge record.
    pub fn new(
        from: impl Into<NodeKind>,
        router: RouterFn,
        targets: BTreeMap<String, NodeKind>,
    ) -> Self {
        Self {
            from: from.into(),
            router,
            targets,
        }
    }

    /// The source node of this edge.
    #[must_use]
    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    /// The label→target mapping, in label order.
    #[must_use]
    pub fn targets(&self) -> &BTreeMap<String, NodeKind> {
        &self.targets
    }

    /// Invokes the routing function against `snapshot` and maps the returned
    /// label to a target node.
    pub fn resolve(&self, snapshot: &StateSnapshot) -> Result<NodeKind, RoutingError> {
        let label = (self.router)(snapshot);
        self.targets
            .get(&label)
            .cloned()
            .ok_or_else(|| RoutingError {
                source_node: self.from.clone(),
                label,
            })
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

// Structural equality ignores the routing closure.
impl PartialEq for ConditionalEdge {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.targets == other.targets
    }
}

/// A routing function produced a label absent from its mapping.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("routing function on node {source_node} returned unmapped label \"{label}\"")]
#[diagnostic(
    code(lockstep::graphs::unmapped_label),
    help("Every label the routing function can return must be a key of the edge's mapping.")
)]
pub struct RoutingError {
    /// Node whose conditional edge failed to resolve.
    pub source_node: NodeKind,
    /// The label that had no mapping entry.
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorkflowState;
    use serde_json::json;

    fn question_edge() -> ConditionalEdge {
        let router: RouterFn = Arc::new(|snapshot| {
            let text = snapshot.get("text").and_then(|v| v.as_str()).unwrap_or("");
            if text.contains('?') {
                "question".to_string()
            } else {
                "other".to_string()
            }
        });
        let mut targets = BTreeMap::new();
        targets.insert("question".to_string(), NodeKind::Custom("ask".into()));
        targets.insert("other".to_string(), NodeKind::Custom("thank".into()));
        ConditionalEdge::new(NodeKind::Custom("extract".into()), router, targets)
    }

    #[test]
    fn resolve_maps_label_to_target() {
        let edge = question_edge();
        let state = WorkflowState::builder()
            .with_value("text", json!("Is this vegan?"))
            .build();
        let target = edge.resolve(&state.snapshot()).unwrap();
        assert_eq!(target, NodeKind::Custom("ask".into()));
    }

    #[test]
    fn resolve_rejects_unmapped_label() {
        let router: RouterFn = Arc::new(|_| "nowhere".to_string());
        let mut targets = BTreeMap::new();
        targets.insert("somewhere".to_string(), NodeKind::End);
        let edge = ConditionalEdge::new(NodeKind::Custom("src".into()), router, targets);

        let err = edge.resolve(&WorkflowState::new().snapshot()).unwrap_err();
        assert_eq!(err.label, "nowhere");
        assert_eq!(err.source_node, NodeKind::Custom("src".into()));
    }

    #[test]
    fn equality_ignores_the_router_closure() {
        let a = question_edge();
        let b = question_edge();
        assert_eq!(a, b);
    }
}
