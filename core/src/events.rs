//! Engine notifications: the tagged union of events and the listener trait.
//!
//! Every observable transition of the search is one variant of
//! [`SearchEvent`]; there is no untyped publish/subscribe bus. The same enum
//! is used for both channels of the protocol: `step()` returns events to the
//! pull-driven caller, and registered [`SearchListener`]s receive the full
//! push stream (including per-node transitions that `step()` never returns
//! directly).

use crate::node::NodeId;
use crate::path::EvaluatedSearchPath;

/// Lifecycle tag of a node in the search graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Constructed but not yet integrated into OPEN/CLOSED/EXPANDING.
    Created,
    /// Discovered and awaiting expansion.
    Open,
    /// Currently undergoing successor integration.
    Expanding,
    /// Fully expanded.
    Closed,
    /// Dropped because its evaluator produced no value.
    Pruned,
    /// Dropped because its evaluation timed out (and no fallback applied).
    TimedOut,
    /// Dropped because its evaluation failed.
    Failed,
}

/// One discrete search event.
#[derive(Debug, Clone)]
pub enum SearchEvent<S, A, L> {
    /// The search graph was initialized with the given root nodes.
    Initialized {
        /// Ids of the root nodes, in generator order.
        roots: Vec<NodeId>,
    },
    /// A new node was reached (root creation or successor creation).
    NodeCreated {
        node: NodeId,
        parent: Option<NodeId>,
        state: S,
        is_goal: bool,
    },
    /// A node switched lifecycle status.
    NodeStatusSwitched { node: NodeId, status: NodeStatus },
    /// A node was discarded by a parent-discarding rule and will not be part
    /// of the search graph.
    NodeRemoved { node: NodeId },
    /// A closed node was reopened with a better parent and label.
    ParentSwitched {
        node: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    },
    /// Successor computation finished for a node.
    SuccessorsComputed { node: NodeId, successors: usize },
    /// Node-building units for all successors of a node were submitted
    /// (inline execution runs them before this event is returned).
    ExpansionSubmitted { node: NodeId, successors: usize },
    /// A goal-reaching path was found.
    SolutionFound {
        solution: EvaluatedSearchPath<S, A, L>,
    },
    /// OPEN is exhausted and no jobs are in flight; the search is over.
    Finished,
}

/// Push-notification consumer (visualizers, planning layers).
///
/// Listeners are invoked inline from engine and worker threads; they should
/// return quickly and must not call back into the engine.
pub trait SearchListener<S, A, L>: Send {
    /// Observe one event.
    fn on_event(&mut self, event: &SearchEvent<S, A, L>);
}

impl<S, A, L, F> SearchListener<S, A, L> for F
where
    F: FnMut(&SearchEvent<S, A, L>) + Send,
{
    fn on_event(&mut self, event: &SearchEvent<S, A, L>) {
        self(event);
    }
}
