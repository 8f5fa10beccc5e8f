//! State merge strategies and the per-key reducer model.
//!
//! Every state key has exactly one [`Reducer`], resolved at compile time from
//! the [`StateSchema`]. During the barrier merge the driver computes
//! `v' = reduce_k(v, d)` for each key `d` a node's delta touches:
//!
//! - [`Reducer::Overwrite`] — ignores the current value, keeps the delta
//!   (the default for undeclared keys);
//! - [`Reducer::Append`] — concatenates JSON arrays; a missing current value
//!   counts as the empty array, anything non-array is a [`MergeError`];
//! - [`Reducer::Custom`] — a caller-supplied combine function. The engine
//!   imposes no constraints on it; if it is not commutative and two nodes in
//!   one superstep write the same key, the result depends on the documented
//!   tie-break (node registration order).

mod registry;
mod schema;

pub use registry::ReducerRegistry;
pub use schema::StateSchema;

use miette::Diagnostic;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Caller-supplied binary combine function for [`Reducer::Custom`].
///
/// Receives the current value for the key (`Value::Null` when the key is
/// absent) and the newly produced delta, and returns the merged value.
pub type CombineFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Merge strategy for a single state key.
#[derive(Clone)]
pub enum Reducer {
    /// Last write wins; the current value is discarded.
    Overwrite,
    /// Sequence concatenation; both sides must be JSON arrays.
    Append,
    /// User-defined combine function.
    Custom(CombineFn),
}

impl Reducer {
    /// Applies this reducer to one key.
    ///
    /// `current` is the value already in the running state (`None` when the
    /// key has not been written yet), `delta` the node-produced update.
    pub fn apply(
        &self,
        key: &str,
        current: Option<Value>,
        delta: Value,
    ) -> Result<Value, MergeError> {
        match self {
            Reducer::Overwrite => Ok(delta),
            Reducer::Append => {
                let mut merged = match current {
                    None => Vec::new(),
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        return Err(MergeError::NotASequence {
                            key: key.to_string(),
                            side: "accumulator",
                            found: json_type_name(&other),
                        });
                    }
                };
                match delta {
                    Value::Array(items) => {
                        merged.extend(items);
                        Ok(Value::Array(merged))
                    }
                    other => Err(MergeError::NotASequence {
                        key: key.to_string(),
                        side: "delta",
                        found: json_type_name(&other),
                    }),
                }
            }
            Reducer::Custom(combine) => Ok(combine(current.unwrap_or(Value::Null), delta)),
        }
    }

    /// Short name of the strategy, used for display and structural equality.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Reducer::Overwrite => "overwrite",
            Reducer::Append => "append",
            Reducer::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

// Combine closures have no meaningful equality; reducers compare by kind.
impl PartialEq for Reducer {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Reducer {}

/// A reducer received incompatible accumulator/delta types.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum MergeError {
    /// The append reducer saw a non-array on one side.
    #[error("append reducer on key \"{key}\": {side} is {found}, expected a sequence")]
    #[diagnostic(
        code(lockstep::reducers::not_a_sequence),
        help("Keys declared `append` must only ever hold JSON arrays.")
    )]
    NotASequence {
        key: String,
        side: &'static str,
        found: &'static str,
    },
}

/// Human-readable JSON type name for merge diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
