//! Shared state for workflow execution.
//!
//! The engine threads a single [`WorkflowState`] through a run: an ordered
//! mapping from string keys to JSON values. Nodes never touch it directly —
//! each superstep they receive an immutable [`StateSnapshot`] and return a
//! delta, which the driver merges through the reducers declared in the
//! [`StateSchema`](crate::reducers::StateSchema).
//!
//! The map is a `BTreeMap` on purpose: iteration order is part of the
//! engine's determinism guarantee, so merging the same deltas always visits
//! keys in the same order.
//!
//! # Examples
//!
//! ```rust
//! use lockstep::state::WorkflowState;
//! use serde_json::json;
//!
//! let state = WorkflowState::builder()
//!     .with_value("payload", json!([{"customer_remark": "Is this vegan?"}]))
//!     .with_value("attempts", json!(0))
//!     .build();
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.get("attempts"), Some(&json!(0)));
//! ```

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The running state of one workflow invocation.
///
/// Created fresh per invocation and discarded afterwards; the engine keeps no
/// state across runs. Written only by the driver during the merge phase,
/// never concurrently.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    values: BTreeMap<String, Value>,
}

impl WorkflowState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for fluent initial-state construction.
    #[must_use]
    pub fn builder() -> WorkflowStateBuilder {
        WorkflowStateBuilder::default()
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Removes `key`, returning the previous value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Read access to the underlying ordered map.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clones the current contents into an immutable [`StateSnapshot`].
    ///
    /// Every node in a superstep receives its own snapshot taken before any
    /// of them ran, so siblings never observe each other's output mid-step.
    /// O(n) in the stored data.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self.values.clone(),
        }
    }

    /// Consumes the state, yielding the underlying map.
    #[must_use]
    pub fn into_values(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl From<BTreeMap<String, Value>> for WorkflowState {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

/// Immutable view of workflow state at the start of a superstep.
///
/// Passed to node executions and routing functions. Snapshots are independent
/// of the running state: later merges do not show through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    values: BTreeMap<String, Value>,
}

impl StateSnapshot {
    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read access to the underlying ordered map.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Number of keys in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the snapshot holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fluent builder for [`WorkflowState`].
///
/// # Examples
///
/// ```rust
/// use lockstep::state::WorkflowState;
/// use serde_json::json;
///
/// let state = WorkflowState::builder()
///     .with_value("text", json!("Is this vegan?"))
///     .build();
/// assert_eq!(state.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct WorkflowStateBuilder {
    values: BTreeMap<String, Value>,
}

impl WorkflowStateBuilder {
    /// Adds one key/value pair to the initial state.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Builds the final [`WorkflowState`].
    #[must_use]
    pub fn build(self) -> WorkflowState {
        WorkflowState {
            values: self.values,
        }
    }
}
