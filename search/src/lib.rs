//! Wayfarer Search: best-first search over implicit graphs with a pull-based
//! step protocol and optional parallel node attachment.
//!
//! The engine explores a conceptually infinite graph supplied by a
//! [`wayfarer_core::GraphGenerator`], ordered by a pluggable
//! [`wayfarer_core::NodeEvaluator`], and yields goal-reaching paths one at a
//! time, on demand, without materializing the whole graph.
//!
//! # Key types
//!
//! - [`BestFirstSearch`] — the engine: `step()`, `cancel()`, `bootstrap()`
//! - [`SearchGraphStore`] — OPEN/CLOSED/EXPANDING bookkeeping and the
//!   external-state index
//! - [`NodeRecord`] — the internal node: parent link, label, goal flag,
//!   annotations

#![forbid(unsafe_code)]

mod builder;
pub mod engine;
pub mod node;
pub mod store;

pub use engine::{BestFirstSearch, CancelHandle, EngineStatus};
pub use node::NodeRecord;
pub use store::SearchGraphStore;
