//! Search paths and evaluated (scored) paths.

use std::collections::HashMap;

/// A path through the search graph: states from the root to a leaf, with the
/// actions labeling the edges between them.
///
/// Invariant: `actions.len() == states.len() - 1` for a non-empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath<S, A> {
    /// States from root (first) to leaf (last).
    pub states: Vec<S>,
    /// Edge actions; `actions[i]` leads from `states[i]` to `states[i + 1]`.
    pub actions: Vec<A>,
}

impl<S, A> SearchPath<S, A> {
    /// A single-node path consisting of just a root state.
    #[must_use]
    pub fn root(state: S) -> Self {
        Self {
            states: vec![state],
            actions: Vec::new(),
        }
    }

    /// The leaf (last) state, if the path is non-empty.
    #[must_use]
    pub fn leaf(&self) -> Option<&S> {
        self.states.last()
    }

    /// Number of edges in the path (the leaf's depth; 0 for a bare root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.actions.len()
    }
}

/// A complete root-to-goal path together with its score, as delivered by
/// solution events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedSearchPath<S, A, L> {
    /// The full path from a root to the goal node.
    pub path: SearchPath<S, A>,
    /// The goal node's label, reported as the solution's score.
    pub score: L,
    /// Free-form diagnostic metadata attached to the solution.
    pub annotations: HashMap<String, serde_json::Value>,
}

impl<S, A, L> EvaluatedSearchPath<S, A, L> {
    /// Build a solution record with empty annotations.
    #[must_use]
    pub fn new(path: SearchPath<S, A>, score: L) -> Self {
        Self {
            path,
            score,
            annotations: HashMap::new(),
        }
    }
}
