//! # Lockstep: deterministic superstep workflow engine
//!
//! Lockstep executes a directed graph of processing steps that share one
//! mutable state structure. Execution proceeds in barrier-synchronized
//! batches ("supersteps"): every node in the current frontier runs against a
//! read-only snapshot of the state, all results are joined, the per-node
//! deltas merge through declared per-key reducers, and the next frontier is
//! computed from unconditional edges and conditionally routed edges.
//!
//! ## Core concepts
//!
//! - **Nodes**: async units of work returning partial-state deltas
//! - **State**: one ordered key→JSON-value map per invocation
//! - **Reducers**: per-key merge operators (overwrite, append, custom)
//! - **Graph**: declarative topology with conditional label-routed edges
//! - **Scheduler**: concurrent frontier fan-out with a barrier merge
//! - **Driver**: blocking `invoke` and pull-based `stream` over one loop
//!
//! ## Quick start
//!
//! ```rust
//! use lockstep::graphs::GraphBuilder;
//! use lockstep::node::{Node, NodeContext, NodeError, NodePartial};
//! use lockstep::reducers::StateSchema;
//! use lockstep::state::{StateSnapshot, WorkflowState};
//! use lockstep::types::NodeKind;
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Node for Greet {
//!     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::new().with_update("greeting", json!("hello")))
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio::runtime::Builder::new_current_thread().enable_all().build()?.block_on(async {
//! let app = GraphBuilder::new()
//!     .add_node("greet", Greet)?
//!     .add_edge(NodeKind::Start, "greet")
//!     .add_edge("greet", NodeKind::End)
//!     .with_schema(StateSchema::new())
//!     .compile()?;
//!
//! let final_state = app.invoke(WorkflowState::new()).await?;
//! assert_eq!(final_state.get("greeting"), Some(&json!("hello")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Determinism
//!
//! For pure node functions, two invocations with the same initial state
//! produce the same final state. Within a superstep no ordering is promised
//! among node *executions*, but merges always apply in node registration
//! order — the documented tie-break when two nodes write the same key
//! through a non-commutative reducer — and frontiers are deduplicated and
//! registration-ordered.
//!
//! ## Failure model
//!
//! Build and compile errors are synchronous and fail fast. At run time a
//! node error aborts its whole superstep before anything merges, so the
//! observed state is always a fully merged, consistent snapshot; routing,
//! merge, recursion-limit, cancellation, and deadline errors likewise abort
//! the run with no retry. See
//! [`ExecutionError`](crate::runtimes::ExecutionError).
//!
//! ## Module guide
//!
//! - [`types`] — node identifiers and the Start/End sentinels
//! - [`node`] — the `Node` trait and delta types
//! - [`state`] — workflow state and snapshots
//! - [`reducers`] — merge strategies, schema, reducer table
//! - [`graphs`] — builder, conditional edges, compile-time validation
//! - [`app`] — the compiled graph and its entry points
//! - [`schedulers`] — the concurrent superstep executor
//! - [`runtimes`] — driver loop, frames, configuration, run-time errors
//! - [`telemetry`] — tracing subscriber bootstrap

pub mod app;
pub mod graphs;
pub mod node;
pub mod reducers;
pub mod runtimes;
pub mod schedulers;
pub mod state;
pub mod telemetry;
pub mod types;
