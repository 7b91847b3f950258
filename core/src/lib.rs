//! Wayfarer Core: data model and collaborator contracts for best-first search.
//!
//! This crate holds everything a graph-generator or node-evaluator author
//! needs to integrate with the engine in `wayfarer_search`, without pulling
//! in the engine's concurrency machinery.
//!
//! # Crate dependency graph
//!
//! ```text
//! wayfarer_core  ←  wayfarer_search  ←  wayfarer_harness
//! (model, contracts)  (store, engine)     (worlds, fixtures)
//! ```
//!
//! # Key types
//!
//! - [`NodeId`] — identity of an internal search node
//! - [`GraphGenerator`] — implicit-graph supplier (roots, successors, goal test)
//! - [`NodeEvaluator`] — node labeling function with optional capabilities
//! - [`SearchEvent`] — tagged union of engine notifications
//! - [`SearchError`] / [`EvaluationError`] — fatal vs. per-node failures
//! - [`SearchConfig`] — parent discarding and worker configuration

#![forbid(unsafe_code)]

pub mod config;
pub mod contract;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod node;
pub mod path;

pub use config::{ParentDiscarding, SearchConfig};
pub use contract::{GoalTester, GraphGenerator, SuccessorDescription};
pub use error::SearchError;
pub use evaluator::{EvaluationError, NodeEvaluator};
pub use events::{NodeStatus, SearchEvent, SearchListener};
pub use node::NodeId;
pub use path::{EvaluatedSearchPath, SearchPath};
