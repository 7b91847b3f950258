//! Node evaluators with controllable behavior.
//!
//! Each evaluator isolates one engine concern: label ordering (depth and
//! weighted cost), slowness (timeout racing), closures for ad-hoc behavior,
//! and the optional capabilities (cancellation, solution reporting).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use wayfarer_core::evaluator::{
    CancelableEvaluator, EvaluationError, NodeEvaluator, SolutionReportingEvaluator,
    SolutionSender,
};
use wayfarer_core::path::{EvaluatedSearchPath, SearchPath};

/// Labels every node with its depth. The resulting order is breadth-first.
pub struct DepthEvaluator;

impl<S, A> NodeEvaluator<S, A, i64> for DepthEvaluator {
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<i64, EvaluationError> {
        Ok(i64::try_from(path.depth()).unwrap_or(i64::MAX))
    }
}

/// Labels a node with the summed weight of the actions on its path.
///
/// Actions without an explicit weight cost `default_weight`. Weights may be
/// negative, which lets a world force a strictly better rediscovery of an
/// already-closed state.
pub struct WeightedCostEvaluator {
    weights: HashMap<String, i64>,
    default_weight: i64,
}

impl WeightedCostEvaluator {
    #[must_use]
    pub fn new(default_weight: i64) -> Self {
        Self {
            weights: HashMap::new(),
            default_weight,
        }
    }

    #[must_use]
    pub fn with(mut self, action: &str, weight: i64) -> Self {
        self.weights.insert(action.to_string(), weight);
        self
    }
}

impl<S> NodeEvaluator<S, String, i64> for WeightedCostEvaluator {
    fn evaluate(&self, path: &SearchPath<S, String>) -> Result<i64, EvaluationError> {
        Ok(path
            .actions
            .iter()
            .map(|a| self.weights.get(a).copied().unwrap_or(self.default_weight))
            .sum())
    }
}

/// Wraps a closure as an evaluator.
pub struct FnEvaluator<F>(pub F);

impl<S, A, L, F> NodeEvaluator<S, A, L> for FnEvaluator<F>
where
    F: Fn(&SearchPath<S, A>) -> Result<L, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<L, EvaluationError> {
        (self.0)(path)
    }
}

/// Sleeps before delegating, to lose (or win) the per-node timeout race.
pub struct SlowEvaluator<E> {
    pub delay: Duration,
    pub inner: E,
}

impl<S, A, L, E> NodeEvaluator<S, A, L> for SlowEvaluator<E>
where
    E: NodeEvaluator<S, A, L>,
{
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<L, EvaluationError> {
        thread::sleep(self.delay);
        self.inner.evaluate(path)
    }
}

/// Depth evaluator with the cancellation capability: records whether the
/// engine forwarded a cancellation.
pub struct CancelProbeEvaluator {
    canceled: Arc<AtomicBool>,
}

impl CancelProbeEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that flips once `cancel_evaluation` has been called.
    #[must_use]
    pub fn probe(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }
}

impl Default for CancelProbeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> NodeEvaluator<S, A, i64> for CancelProbeEvaluator {
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<i64, EvaluationError> {
        Ok(i64::try_from(path.depth()).unwrap_or(i64::MAX))
    }

    fn as_cancelable(&self) -> Option<&dyn CancelableEvaluator> {
        Some(self)
    }
}

impl CancelableEvaluator for CancelProbeEvaluator {
    fn cancel_evaluation(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

/// Depth evaluator with the solution-reporting capability: announces the
/// path to `target` out-of-band the moment it labels it.
pub struct AnnouncingEvaluator<S> {
    target: S,
    sender: Mutex<Option<SolutionSender<S, String, i64>>>,
}

impl<S> AnnouncingEvaluator<S> {
    #[must_use]
    pub fn new(target: S) -> Self {
        Self {
            target,
            sender: Mutex::new(None),
        }
    }
}

impl<S> NodeEvaluator<S, String, i64> for AnnouncingEvaluator<S>
where
    S: Clone + PartialEq + Send + Sync,
{
    fn evaluate(&self, path: &SearchPath<S, String>) -> Result<i64, EvaluationError> {
        let depth = i64::try_from(path.depth()).unwrap_or(i64::MAX);
        if path.leaf() == Some(&self.target) {
            if let Some(sender) = &*self.sender.lock() {
                let _ = sender.send(EvaluatedSearchPath::new(path.clone(), depth));
            }
        }
        Ok(depth)
    }

    fn as_solution_reporting(&self) -> Option<&dyn SolutionReportingEvaluator<S, String, i64>> {
        Some(self)
    }
}

impl<S> SolutionReportingEvaluator<S, String, i64> for AnnouncingEvaluator<S>
where
    S: Clone + PartialEq + Send + Sync,
{
    fn register_solution_listener(&self, sender: SolutionSender<S, String, i64>) {
        *self.sender.lock() = Some(sender);
    }
}
