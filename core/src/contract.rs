//! Graph generator contract.
//!
//! A generator describes an implicit graph: it supplies the root state(s),
//! expands a state into action-labeled successor descriptions, and carries
//! the goal test. The engine never materializes the graph beyond the nodes
//! the generator has been asked to expand.
//!
//! # Contract
//!
//! - `roots` must return at least one state; an empty root set is a
//!   structural error at initialization.
//! - Under the tree-search assumption, no two distinct root-paths may reach
//!   the same external state unless a parent-discarding rule is configured to
//!   consume the rediscovery.
//! - Enumeration should be deterministic: same state, same successors in the
//!   same order.

use std::sync::Arc;

/// One successor proposed by a generator: the target state plus the label of
/// the edge leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessorDescription<S, A> {
    /// The successor's external state.
    pub state: S,
    /// The action labeling the edge from the expanded state.
    pub action: A,
}

/// Goal test variant: node-local or path-dependent.
///
/// The engine supports both uniformly; for the path variant, goal testing is
/// deferred until the candidate's full root path has been materialized.
pub enum GoalTester<S> {
    /// Goal property decidable from a single state.
    Node(Arc<dyn Fn(&S) -> bool + Send + Sync>),
    /// Goal property of the entire root path (root first, candidate last).
    Path(Arc<dyn Fn(&[S]) -> bool + Send + Sync>),
}

impl<S> GoalTester<S> {
    /// Build a node-local goal tester.
    pub fn node(f: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        Self::Node(Arc::new(f))
    }

    /// Build a path-dependent goal tester.
    pub fn path(f: impl Fn(&[S]) -> bool + Send + Sync + 'static) -> Self {
        Self::Path(Arc::new(f))
    }

    /// Apply the tester to a root path (root first, candidate last).
    ///
    /// An empty path is never a goal.
    #[must_use]
    pub fn is_goal(&self, path: &[S]) -> bool {
        match self {
            Self::Node(f) => path.last().is_some_and(|s| f(s)),
            Self::Path(f) => !path.is_empty() && f(path),
        }
    }
}

impl<S> Clone for GoalTester<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Node(f) => Self::Node(Arc::clone(f)),
            Self::Path(f) => Self::Path(Arc::clone(f)),
        }
    }
}

impl<S> std::fmt::Debug for GoalTester<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(_) => f.write_str("GoalTester::Node"),
            Self::Path(_) => f.write_str("GoalTester::Path"),
        }
    }
}

/// Trait for implicit-graph suppliers.
pub trait GraphGenerator<S, A>: Send + Sync {
    /// The root state(s) of the graph. Must be non-empty.
    fn roots(&self) -> Vec<S>;

    /// Expand a state into its action-labeled successors. May be empty.
    fn successors(&self, state: &S) -> Vec<SuccessorDescription<S, A>>;

    /// The goal test for this graph.
    fn goal_tester(&self) -> GoalTester<S>;
}
