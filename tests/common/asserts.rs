#![allow(dead_code)]

use serde_json::Value;

use lockstep::app::App;
use lockstep::state::WorkflowState;
use lockstep::types::NodeKind;

pub fn assert_value(state: &WorkflowState, key: &str, expected: &Value) {
    assert_eq!(
        state.get(key),
        Some(expected),
        "expected state[{key:?}] == {expected}, got {:?}",
        state.get(key)
    );
}

pub fn assert_no_value(state: &WorkflowState, key: &str) {
    assert!(
        state.get(key).is_none(),
        "expected state[{key:?}] to be absent, got {:?}",
        state.get(key)
    );
}

pub fn assert_edge(app: &App, from: NodeKind, to: NodeKind) {
    let outs = app.edges().get(&from).expect("source node has edges");
    assert!(outs.contains(&to), "expected edge {from:?} -> {to:?}");
}
