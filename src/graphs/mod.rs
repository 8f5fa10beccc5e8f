//! Graph definition and compilation.
//!
//! Workflows are declared with [`GraphBuilder`] — nodes, unconditional
//! edges, and conditional edges with explicit label→target mappings — then
//! validated and frozen into an executable [`App`](crate::app::App) by
//! [`GraphBuilder::compile`].
//!
//! # Quick start
//!
//! ```rust
//! use lockstep::graphs::{GraphBuilder, RouterFn};
//! use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
//! use lockstep::state::StateSnapshot;
//! use lockstep::types::NodeKind;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Classify;
//!
//! #[async_trait]
//! impl Node for Classify {
//!     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::default())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let route: RouterFn = Arc::new(|snapshot| {
//!     if snapshot.contains_key("urgent") { "fast".into() } else { "slow".into() }
//! });
//!
//! let app = GraphBuilder::new()
//!     .add_node("classify", Classify)?
//!     .add_node("fast_lane", Classify)?
//!     .add_node("slow_lane", Classify)?
//!     .add_edge(NodeKind::Start, "classify")
//!     .add_conditional_edges("classify", route, [("fast", "fast_lane"), ("slow", "slow_lane")])
//!     .add_edge("fast_lane", NodeKind::End)
//!     .add_edge("slow_lane", NodeKind::End)
//!     .compile()?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod compilation;
mod edges;

pub use builder::{BuildError, GraphBuilder};
pub use compilation::ValidationError;
pub use edges::{ConditionalEdge, RouterFn, RoutingError};
