//! Pull-based superstep streaming through `App::stream`.

mod common;
use common::*;

use futures_util::StreamExt;
use serde_json::json;

use lockstep::graphs::GraphBuilder;
use lockstep::reducers::StateSchema;
use lockstep::runtimes::{ExecutionError, RuntimeConfig, StepReport};
use lockstep::state::WorkflowState;
use lockstep::types::NodeKind;

fn three_step_app() -> lockstep::app::App {
    GraphBuilder::new()
        .add_node("first", AppendNode::new("log", json!("a")))
        .unwrap()
        .add_node("second", AppendNode::new("log", json!("b")))
        .unwrap()
        .add_node("third", AppendNode::new("log", json!("c")))
        .unwrap()
        .add_edge(NodeKind::Start, "first")
        .add_edge("first", "second")
        .add_edge("second", "third")
        .add_edge("third", NodeKind::End)
        .with_schema(StateSchema::new().with_append("log"))
        .compile()
        .unwrap()
}

#[tokio::test]
async fn stream_yields_one_event_per_superstep() {
    let mut stream = three_step_app().stream(WorkflowState::new());

    let mut reports: Vec<StepReport> = Vec::new();
    while let Some(item) = stream.next().await {
        reports.push(item.unwrap());
    }

    assert_eq!(reports.len(), 3);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.step, (i + 1) as u64);
        assert_eq!(report.ran_nodes.len(), 1);
    }
    assert!(reports[2].completed);
    assert_eq!(reports[2].next_frontier, vec![NodeKind::End]);
}

#[tokio::test]
async fn stream_events_carry_pre_merge_deltas() {
    let mut stream = three_step_app().stream(WorkflowState::new());

    let first = stream.next().await.unwrap().unwrap();
    let (node, delta) = &first.writes[0];
    assert_eq!(node, &NodeKind::Custom("first".into()));
    // The delta is the node's own contribution, not the merged sequence.
    assert_eq!(delta.get("log"), Some(&json!(["a"])));
    assert_eq!(first.state.get("log"), Some(&json!(["a"])));

    let second = stream.next().await.unwrap().unwrap();
    let (_, delta) = &second.writes[0];
    assert_eq!(delta.get("log"), Some(&json!(["b"])));
    // The post-merge snapshot shows the accumulated sequence.
    assert_eq!(second.state.get("log"), Some(&json!(["a", "b"])));
}

#[tokio::test]
async fn dropping_the_stream_abandons_remaining_supersteps() {
    let mut stream = three_step_app().stream(WorkflowState::new());
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.step, 1);
    drop(stream);
    // Nothing to observe beyond the absence of a hang: execution is driven
    // by consumption, so no further supersteps ran.
}

#[tokio::test]
async fn stream_terminates_with_the_error_after_valid_events() {
    let app = GraphBuilder::new()
        .add_node("ok", AppendNode::new("log", json!("ok")))
        .unwrap()
        .add_node("bad", FailingNode::default())
        .unwrap()
        .add_edge(NodeKind::Start, "ok")
        .add_edge("ok", "bad")
        .add_edge("bad", NodeKind::End)
        .with_schema(StateSchema::new().with_append("log"))
        .compile()
        .unwrap();

    let mut stream = app.stream(WorkflowState::new());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.step, 1);

    let second = stream.next().await.unwrap();
    match second {
        Err(ExecutionError::NodeExecution { node, step, .. }) => {
            assert_eq!(node, NodeKind::Custom("bad".into()));
            assert_eq!(step, 2);
        }
        other => panic!("expected the node failure, got {other:?}"),
    }

    assert!(stream.next().await.is_none(), "stream ends after the error");
}

#[tokio::test]
async fn cyclic_stream_hits_the_limit_after_exactly_n_events() {
    let app = GraphBuilder::new()
        .add_node("spin", NoopNode)
        .unwrap()
        .add_edge(NodeKind::Start, "spin")
        .add_edge("spin", "spin")
        .with_runtime_config(RuntimeConfig::new().with_recursion_limit(5))
        .compile()
        .unwrap();

    let mut stream = app.stream(WorkflowState::new());
    let mut ok_events = 0u32;
    let err = loop {
        match stream.next().await.unwrap() {
            Ok(_) => ok_events += 1,
            Err(err) => break err,
        }
    };

    assert_eq!(ok_events, 5, "exactly the configured number of supersteps ran");
    assert!(matches!(err, ExecutionError::RecursionLimit { limit: 5 }));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn sentinel_only_graph_streams_no_events() {
    let app = GraphBuilder::new()
        .add_edge(NodeKind::Start, NodeKind::End)
        .compile()
        .unwrap();
    let mut stream = app.stream(WorkflowState::new());
    assert!(stream.next().await.is_none());
}
