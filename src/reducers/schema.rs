//! Per-key reducer declarations.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{CombineFn, Reducer};
use serde_json::Value;

/// Declares the merge strategy for each state key.
///
/// Handed to [`GraphBuilder::with_schema`](crate::graphs::GraphBuilder::with_schema)
/// and frozen into a [`ReducerRegistry`](crate::reducers::ReducerRegistry) at
/// compile time. Keys with no declaration default to
/// [`Reducer::Overwrite`].
///
/// # Examples
///
/// ```rust
/// use lockstep::reducers::StateSchema;
/// use serde_json::json;
///
/// let schema = StateSchema::new()
///     .with_append("answer")
///     .with_custom("attempts", |current, delta| {
///         json!(current.as_i64().unwrap_or(0) + delta.as_i64().unwrap_or(0))
///     });
///
/// assert_eq!(schema.reducer_for("answer").kind(), "append");
/// assert_eq!(schema.reducer_for("anything_else").kind(), "overwrite");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSchema {
    reducers: BTreeMap<String, Reducer>,
}

impl StateSchema {
    /// Creates an empty schema (every key defaults to overwrite).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `key` with an explicit reducer.
    #[must_use]
    pub fn with_reducer(mut self, key: impl Into<String>, reducer: Reducer) -> Self {
        self.reducers.insert(key.into(), reducer);
        self
    }

    /// Declares `key` as overwrite (last write wins). Redundant with the
    /// default, but lets callers document intent.
    #[must_use]
    pub fn with_overwrite(self, key: impl Into<String>) -> Self {
        self.with_reducer(key, Reducer::Overwrite)
    }

    /// Declares `key` as sequence concatenation.
    #[must_use]
    pub fn with_append(self, key: impl Into<String>) -> Self {
        self.with_reducer(key, Reducer::Append)
    }

    /// Declares `key` with a caller-supplied combine function.
    ///
    /// The function receives the current value (`Value::Null` when the key is
    /// absent) and the delta, and returns the merged value.
    #[must_use]
    pub fn with_custom(
        self,
        key: impl Into<String>,
        combine: impl Fn(Value, Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.with_reducer(key, Reducer::Custom(Arc::new(combine) as CombineFn))
    }

    /// The reducer declared for `key`, falling back to overwrite.
    #[must_use]
    pub fn reducer_for(&self, key: &str) -> &Reducer {
        static OVERWRITE: Reducer = Reducer::Overwrite;
        self.reducers.get(key).unwrap_or(&OVERWRITE)
    }

    /// The explicit declarations, in key order.
    #[must_use]
    pub fn declarations(&self) -> &BTreeMap<String, Reducer> {
        &self.reducers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn undeclared_keys_default_to_overwrite() {
        let schema = StateSchema::new().with_append("log");
        assert_eq!(schema.reducer_for("log").kind(), "append");
        assert_eq!(schema.reducer_for("other").kind(), "overwrite");
    }

    #[test]
    fn later_declaration_replaces_earlier() {
        let schema = StateSchema::new()
            .with_append("k")
            .with_custom("k", |_, d| d);
        assert_eq!(schema.reducer_for("k").kind(), "custom");
    }

    #[test]
    fn custom_combiner_runs_through_schema() {
        let schema = StateSchema::new().with_custom("sum", |current, delta| {
            json!(current.as_i64().unwrap_or(0) + delta.as_i64().unwrap_or(0))
        });
        let merged = schema
            .reducer_for("sum")
            .apply("sum", Some(json!(2)), json!(3))
            .unwrap();
        assert_eq!(merged, json!(5));
    }
}
