//! Node evaluator contract.
//!
//! An evaluator computes the internal label (heuristic value) that orders a
//! node on OPEN. Evaluation may be a long-running computation; the engine can
//! race it against a per-node timeout and substitute a fallback evaluator's
//! value on expiry.
//!
//! Optional capabilities are modeled as accessor methods with `None`
//! defaults rather than runtime type inspection: an evaluator opts into
//! solution reporting, cancellation, or graph awareness by returning `Some`
//! from the corresponding accessor.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::contract::GraphGenerator;
use crate::path::{EvaluatedSearchPath, SearchPath};

/// Per-node evaluation failure.
///
/// All variants except `Canceled` are recovered locally: the affected node is
/// pruned and the expansion continues for its siblings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The evaluator declined to produce a value. The node is pruned silently.
    #[error("evaluator produced no value")]
    NoValue,

    /// Evaluation exceeded the per-node timeout. The node is pruned unless a
    /// fallback evaluator yields a value.
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),

    /// The evaluator failed (returned an error or panicked). The node is
    /// pruned and the cause recorded as an annotation.
    #[error("evaluation failed: {detail}")]
    Failed { detail: String },

    /// The evaluator was canceled. Propagated: the whole search stops.
    #[error("evaluation canceled")]
    Canceled,
}

/// Channel end handed to solution-reporting evaluators.
pub type SolutionSender<S, A, L> = Sender<EvaluatedSearchPath<S, A, L>>;

/// Capability: the evaluator announces complete solutions out-of-band,
/// independent of normal node labeling (e.g. heuristics that internally run
/// sub-searches). The engine funnels these through the same solution protocol
/// as organically discovered goals.
pub trait SolutionReportingEvaluator<S, A, L>: Send + Sync {
    /// Receive the sender on which to announce solutions. Called once, at
    /// engine construction.
    fn register_solution_listener(&self, sender: SolutionSender<S, A, L>);
}

/// Capability: the evaluator can be told to abandon in-flight work when the
/// search shuts down.
pub trait CancelableEvaluator: Send + Sync {
    /// Cancel any ongoing evaluation. Must be idempotent.
    fn cancel_evaluation(&self);
}

/// Capability: the evaluator needs global graph context.
pub trait GraphAwareEvaluator<S, A>: Send + Sync {
    /// Receive the graph generator. Called once, at engine construction.
    fn set_generator(&self, generator: Arc<dyn GraphGenerator<S, A>>);
}

/// Trait for node evaluators: the `f`-function of the search.
pub trait NodeEvaluator<S, A, L>: Send + Sync {
    /// Compute the label for the node at the leaf of `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] when no label can be produced; see the
    /// variants for how the engine reacts to each.
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<L, EvaluationError>;

    /// Solution-reporting capability, if implemented.
    fn as_solution_reporting(&self) -> Option<&dyn SolutionReportingEvaluator<S, A, L>> {
        None
    }

    /// Cancellation capability, if implemented.
    fn as_cancelable(&self) -> Option<&dyn CancelableEvaluator> {
        None
    }

    /// Graph-awareness capability, if implemented.
    fn as_graph_aware(&self) -> Option<&dyn GraphAwareEvaluator<S, A>> {
        None
    }
}
