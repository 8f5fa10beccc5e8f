#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
use lockstep::state::StateSnapshot;

/// Writes one fixed value under one key.
#[derive(Debug, Clone)]
pub struct SetNode {
    pub key: &'static str,
    pub value: Value,
}

impl SetNode {
    pub fn new(key: &'static str, value: Value) -> Self {
        Self { key, value }
    }
}

#[async_trait]
impl Node for SetNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_update(self.key, self.value.clone()))
    }
}

/// Contributes a single-element sequence under one key (for append reducers).
#[derive(Debug, Clone)]
pub struct AppendNode {
    pub key: &'static str,
    pub item: Value,
}

impl AppendNode {
    pub fn new(key: &'static str, item: Value) -> Self {
        Self { key, item }
    }
}

#[async_trait]
impl Node for AppendNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_update(self.key, json!([self.item])))
    }
}

/// Records the superstep number it ran in.
#[derive(Debug, Clone)]
pub struct StepStampNode {
    pub key: &'static str,
}

#[async_trait]
impl Node for StepStampNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_update(self.key, json!(ctx.step)))
    }
}

/// Returns an empty delta.
#[derive(Debug, Clone)]
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::default())
    }
}

/// Always fails.
#[derive(Debug, Clone)]
pub struct FailingNode {
    pub message: &'static str,
}

impl Default for FailingNode {
    fn default() -> Self {
        Self { message: "boom" }
    }
}

#[async_trait]
impl Node for FailingNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Err(NodeError::ValidationFailed(self.message.to_string()))
    }
}

/// Sleeps, then writes; for exercising the fan-out under different timings.
#[derive(Debug, Clone)]
pub struct DelayedSetNode {
    pub key: &'static str,
    pub value: Value,
    pub delay_ms: u64,
}

#[async_trait]
impl Node for DelayedSetNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(NodePartial::new().with_update(self.key, self.value.clone()))
    }
}

/// Copies the value it observes under `from` into `to`; snapshot-isolation
/// probes read what the superstep started with, not sibling output.
#[derive(Debug, Clone)]
pub struct ObserveNode {
    pub from: &'static str,
    pub to: &'static str,
}

#[async_trait]
impl Node for ObserveNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let observed = snapshot.get(self.from).cloned().unwrap_or(Value::Null);
        Ok(NodePartial::new().with_update(self.to, observed))
    }
}
