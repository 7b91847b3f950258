//! Internal node records and OPEN ordering keys.

use std::collections::HashMap;

use wayfarer_core::events::NodeStatus;
use wayfarer_core::node::NodeId;

/// An internal search node.
///
/// Exactly one record exists per distinct external state once integrated
/// (tree-search assumption). The parent link makes the integrated records a
/// tree; a node's root path is reconstructed by following `parent`.
#[derive(Debug, Clone)]
pub struct NodeRecord<S, A, L> {
    /// Monotonic identity, assigned in creation order.
    pub id: NodeId,
    /// Predecessor node (`None` for roots).
    pub parent: Option<NodeId>,
    /// Action labeling the edge from the parent (`None` for roots).
    pub edge: Option<A>,
    /// The opaque external state; the identity key of this node.
    pub state: S,
    /// The internal evaluation label; absent while evaluation is pending or
    /// after it failed. A node is never on OPEN without a label.
    pub label: Option<L>,
    /// Whether the goal tester accepted this node at creation time.
    pub is_goal: bool,
    /// Free-form diagnostic metadata (evaluation time, error cause).
    pub annotations: HashMap<String, serde_json::Value>,
    /// Current lifecycle status.
    pub status: NodeStatus,
}

/// OPEN ordering key: `(label, id)`.
///
/// Lower label first; ties broken by creation order (the id), so equal-label
/// nodes pop in insertion sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct OpenKey<L> {
    pub(crate) label: L,
    pub(crate) id: NodeId,
}
