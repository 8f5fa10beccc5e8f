//! Node execution contract for the lockstep workflow engine.
//!
//! A [`Node`] is one unit of work in the graph. Each superstep the scheduler
//! hands every frontier node a [`StateSnapshot`] plus a [`NodeContext`] and
//! collects the returned [`NodePartial`] deltas; nodes never mutate shared
//! state directly. Whatever a node does internally (I/O, side effects) is
//! opaque to the engine and the caller's responsibility to make safe for
//! concurrent invocation within a superstep.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::state::StateSnapshot;

/// Core trait defining executable workflow nodes.
///
/// Implementations should be stateless: everything a node needs arrives in
/// the snapshot, and everything it produces leaves in the returned delta.
/// Returning `Err` aborts the whole superstep — no sibling deltas from that
/// step are merged.
///
/// # Examples
///
/// ```rust
/// use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
/// use lockstep::state::StateSnapshot;
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct Extract;
///
/// #[async_trait]
/// impl Node for Extract {
///     async fn run(
///         &self,
///         snapshot: StateSnapshot,
///         _ctx: NodeContext,
///     ) -> Result<NodePartial, NodeError> {
///         let remark = snapshot
///             .get("payload")
///             .and_then(|p| p.get(0))
///             .and_then(|entry| entry.get("customer_remark"))
///             .and_then(Value::as_str)
///             .ok_or(NodeError::MissingInput { what: "payload" })?;
///         Ok(NodePartial::new().with_update("text", json!(remark)))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node against a read-only snapshot of the current state.
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}

/// Execution context passed to nodes.
///
/// Carries the node's identity and the current superstep number, mainly for
/// logging; nodes have no other channel back into the engine.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Display name of the node being executed.
    pub node_id: String,
    /// Current superstep number (1-based).
    pub step: u64,
}

impl NodeContext {
    /// A tracing span scoped to this node execution.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("node", id = %self.node_id, step = self.step)
    }
}

/// Partial state update returned by a node execution.
///
/// An ordered map of per-key updates. Keys absent from the delta are left
/// untouched by the merge phase; how present keys combine with the running
/// state is decided by the reducer declared for each key in the
/// [`StateSchema`](crate::reducers::StateSchema).
///
/// # Examples
///
/// ```rust
/// use lockstep::node::NodePartial;
/// use serde_json::json;
///
/// let delta = NodePartial::new()
///     .with_update("text", json!("Is this vegan?"))
///     .with_update("answer", json!(["Wow nice question."]));
/// assert_eq!(delta.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodePartial {
    updates: BTreeMap<String, Value>,
}

impl NodePartial {
    /// Creates an empty delta (merging it is a no-op).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one key update to the delta.
    #[must_use]
    pub fn with_update(mut self, key: impl Into<String>, value: Value) -> Self {
        self.updates.insert(key.into(), value);
        self
    }

    /// The updates in key order.
    #[must_use]
    pub fn updates(&self) -> &BTreeMap<String, Value> {
        &self.updates
    }

    /// Returns the update for `key`, if the delta touches it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.updates.get(key)
    }

    /// Number of keys this delta touches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Returns `true` if the delta touches no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for NodePartial {
    fn from(updates: BTreeMap<String, Value>) -> Self {
        Self { updates }
    }
}

/// Errors a node execution can raise.
///
/// Any `Err` from [`Node::run`] is fatal to the run: the engine aborts the
/// current superstep without merging and surfaces the failure, wrapped with
/// the node's identity, to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(lockstep::node::missing_input),
        help("Check that an earlier node produced the required key.")
    )]
    MissingInput { what: &'static str },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(lockstep::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(lockstep::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),
}
