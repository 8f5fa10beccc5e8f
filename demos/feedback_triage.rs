//! Customer-feedback triage: the canonical lockstep walkthrough.
//!
//! Builds a four-node graph — extract the remark, route questions and plain
//! feedback down different branches, beautify the drafted answer — and runs
//! it twice: once with `invoke`, once observing every superstep through
//! `stream`.
//!
//!     cargo run --example feedback_triage

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

use lockstep::graphs::{GraphBuilder, RouterFn};
use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
use lockstep::reducers::StateSchema;
use lockstep::state::{StateSnapshot, WorkflowState};
use lockstep::types::NodeKind;

/// Pulls the customer remark out of the raw payload.
struct Extract;

#[async_trait]
impl Node for Extract {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let remark = snapshot
            .get("payload")
            .and_then(|p| p.get(0))
            .and_then(|entry| entry.get("customer_remark"))
            .and_then(Value::as_str)
            .ok_or(NodeError::MissingInput { what: "payload" })?;
        Ok(NodePartial::new().with_update("text", json!(remark)))
    }
}

/// Drafts an answer for remarks that ask something.
struct Ask;

#[async_trait]
impl Node for Ask {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_update("answer", json!(["Wow nice question."])))
    }
}

/// Drafts an answer for plain feedback.
struct Thank;

#[async_trait]
impl Node for Thank {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_update("answer", json!(["Thanks for the feedback."])))
    }
}

/// Polishes whatever answer the branch drafted.
struct Beautify;

#[async_trait]
impl Node for Beautify {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let last = snapshot
            .get("answer")
            .and_then(Value::as_array)
            .and_then(|items| items.last())
            .and_then(Value::as_str)
            .ok_or(NodeError::MissingInput { what: "answer" })?;
        Ok(NodePartial::new().with_update("answer", json!([format!("{last} beautified")])))
    }
}

fn build_app() -> Result<lockstep::app::App, Box<dyn std::error::Error>> {
    let classify: RouterFn = Arc::new(|snapshot| {
        let text = snapshot.get("text").and_then(Value::as_str).unwrap_or("");
        if text.contains('?') {
            "question".to_string()
        } else {
            "other".to_string()
        }
    });

    let app = GraphBuilder::new()
        .add_node("extract", Extract)?
        .add_node("ask", Ask)?
        .add_node("thank", Thank)?
        .add_node("beautify", Beautify)?
        .add_edge(NodeKind::Start, "extract")
        .add_conditional_edges("extract", classify, [("question", "ask"), ("other", "thank")])
        .add_edge("ask", "beautify")
        .add_edge("thank", "beautify")
        .add_edge("beautify", NodeKind::End)
        .with_schema(StateSchema::new().with_append("answer"))
        .compile()?;
    Ok(app)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lockstep::telemetry::init();

    let app = build_app()?;

    let initial = WorkflowState::builder()
        .with_value("payload", json!([{"customer_remark": "Is this vegan?"}]))
        .build();

    println!("== invoke ==");
    let final_state = app.invoke(initial.clone()).await?;
    println!("text   = {}", final_state.get("text").unwrap());
    println!("answer = {}", final_state.get("answer").unwrap());

    println!("\n== stream ==");
    let mut steps = app.stream(initial);
    while let Some(event) = steps.next().await {
        let report = event?;
        let ran: Vec<String> = report.ran_nodes.iter().map(ToString::to_string).collect();
        println!(
            "step {}: ran [{}], wrote {}",
            report.step,
            ran.join(", "),
            serde_json::to_string(&report.writes)?
        );
    }

    Ok(())
}
