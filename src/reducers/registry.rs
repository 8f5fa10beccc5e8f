//! The frozen reducer table consulted during barrier merges.

use std::collections::BTreeMap;

use super::{MergeError, Reducer, StateSchema};
use crate::node::NodePartial;
use crate::state::WorkflowState;
use tracing::instrument;

/// Immutable per-key reducer table, built from a [`StateSchema`] at compile
/// time.
///
/// The driver applies one node delta at a time through [`apply`](Self::apply);
/// within a delta, keys are visited in the delta's own (ordered-map) order.
/// Which *node's* delta goes first when several touch the same key is the
/// scheduler's concern — node registration order — so the registry itself
/// stays order-agnostic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReducerRegistry {
    table: BTreeMap<String, Reducer>,
}

impl ReducerRegistry {
    /// Freezes a schema into a registry. Undeclared keys fall back to
    /// overwrite at lookup time.
    #[must_use]
    pub(crate) fn from_schema(schema: &StateSchema) -> Self {
        Self {
            table: schema.declarations().clone(),
        }
    }

    /// The reducer in effect for `key`.
    #[must_use]
    pub fn reducer_for(&self, key: &str) -> &Reducer {
        static OVERWRITE: Reducer = Reducer::Overwrite;
        self.table.get(key).unwrap_or(&OVERWRITE)
    }

    /// Merges one node delta into the running state.
    ///
    /// For each key the delta touches, computes `v' = reduce_k(v, d)` and
    /// stores it back. Keys absent from the delta are untouched. Fails fast
    /// on the first incompatible merge; state already merged for earlier keys
    /// of the same delta remains (callers merge into a scratch copy and only
    /// commit a fully successful barrier).
    #[instrument(skip(self, state, partial), err)]
    pub fn apply(
        &self,
        state: &mut WorkflowState,
        partial: &NodePartial,
    ) -> Result<(), MergeError> {
        for (key, delta) in partial.updates() {
            let current = state.get(key).cloned();
            let merged = self.reducer_for(key).apply(key, current, delta.clone())?;
            state.set(key.clone(), merged);
        }
        Ok(())
    }

    /// The explicitly declared keys, in key order.
    #[must_use]
    pub fn declarations(&self) -> &BTreeMap<String, Reducer> {
        &self.table
    }
}
