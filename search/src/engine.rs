//! The best-first search engine: pull-based stepping, expansion, and
//! lifecycle.
//!
//! The caller drives the search by calling [`BestFirstSearch::step`]; each
//! call performs one unit of progress (initialization, one node expansion, or
//! delivery of a found solution) and returns the corresponding
//! [`SearchEvent`]. With a worker pool configured, successor attachment runs
//! concurrently while the driver thread keeps selecting nodes, throttled so
//! at most `num_workers` build jobs are in flight.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing::{debug, info};

use wayfarer_core::config::SearchConfig;
use wayfarer_core::contract::GraphGenerator;
use wayfarer_core::error::SearchError;
use wayfarer_core::evaluator::NodeEvaluator;
use wayfarer_core::events::{NodeStatus, SearchEvent, SearchListener};
use wayfarer_core::node::NodeId;
use wayfarer_core::path::{EvaluatedSearchPath, SearchPath};

use crate::builder::{ExpansionTicket, JobGuard, LabelOutcome, NodeBuilder, SearchCore};

/// Engine lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Constructed; configuration is still mutable and no step has run.
    Created,
    /// At least one step has run; the search graph is live.
    Active,
    /// Finished, canceled, or failed. Further steps are illegal.
    Terminated,
}

/// A best-first search over an implicit graph.
///
/// The engine is generic over the external state `S`, the edge action `A`,
/// and the internal label `L`; nodes pop off OPEN in ascending label order,
/// ties broken by creation order.
pub struct BestFirstSearch<S, A, L> {
    core: Arc<SearchCore<S, A, L>>,
    status: EngineStatus,
    num_workers: usize,
    pool: Option<rayon::ThreadPool>,
    /// Out-of-band solution channel, present for solution-reporting
    /// evaluators.
    solution_rx: Option<mpsc::Receiver<EvaluatedSearchPath<S, A, L>>>,
    graph_ready: bool,
    roots: Vec<NodeId>,
}

impl<S, A, L> BestFirstSearch<S, A, L>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    /// Wire up a new engine. Evaluator capabilities are bound here: a
    /// graph-aware evaluator receives the generator, a solution-reporting
    /// evaluator receives its announcement channel.
    #[must_use]
    pub fn new(
        generator: Arc<dyn GraphGenerator<S, A>>,
        evaluator: Arc<dyn NodeEvaluator<S, A, L>>,
        config: SearchConfig,
    ) -> Self {
        if let Some(aware) = evaluator.as_graph_aware() {
            aware.set_generator(Arc::clone(&generator));
        }
        let mut solution_rx = None;
        let solution_reporting = match evaluator.as_solution_reporting() {
            Some(reporting) => {
                let (tx, rx) = mpsc::channel();
                reporting.register_solution_listener(tx);
                solution_rx = Some(rx);
                true
            }
            None => false,
        };
        let core = Arc::new(SearchCore::new(
            generator,
            evaluator,
            config.parent_discarding,
            solution_reporting,
        ));
        Self {
            core,
            status: EngineStatus::Created,
            num_workers: config.num_workers,
            pool: None,
            solution_rx,
            graph_ready: false,
            roots: Vec::new(),
        }
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Perform one unit of search progress and return what happened.
    ///
    /// The first call initializes the graph and returns
    /// [`SearchEvent::Initialized`]. Subsequent calls deliver a pending
    /// solution if one exists, otherwise expand the best OPEN node. When
    /// OPEN is exhausted and no build jobs remain, the search terminates
    /// with [`SearchEvent::Finished`].
    ///
    /// # Errors
    ///
    /// `IllegalState` after termination, `Canceled` after cancellation, and
    /// any `Structural`/`InvariantViolation` error raised by expansion. Every
    /// error terminates the engine.
    pub fn step(&mut self) -> Result<SearchEvent<S, A, L>, SearchError> {
        match self.status {
            EngineStatus::Terminated => Err(SearchError::IllegalState {
                detail: "step() called after the search terminated".to_string(),
            }),
            EngineStatus::Created => self.activate(),
            EngineStatus::Active => self.advance(),
        }
    }

    /// Run the search until the next solution or exhaustion.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::step`].
    pub fn next_solution(&mut self) -> Result<Option<EvaluatedSearchPath<S, A, L>>, SearchError> {
        loop {
            match self.step()? {
                SearchEvent::SolutionFound { solution } => return Ok(Some(solution)),
                SearchEvent::Finished => return Ok(None),
                _ => {}
            }
        }
    }

    /// Seed the search graph with previously found partial paths instead of
    /// the bare root frontier: prefix interiors go to CLOSED, prefix leaves
    /// go to OPEN carrying their recorded scores.
    ///
    /// # Errors
    ///
    /// `IllegalState` once the search has stepped; `Structural` for an empty
    /// prefix or an empty root set.
    pub fn bootstrap(
        &mut self,
        prefixes: Vec<EvaluatedSearchPath<S, A, L>>,
    ) -> Result<(), SearchError> {
        if self.status != EngineStatus::Created {
            return Err(SearchError::IllegalState {
                detail: "bootstrap is only possible before the first step".to_string(),
            });
        }
        if !self.graph_ready {
            self.init_graph()?;
        }
        self.core.store.lock().clear_open();
        for prefix in prefixes {
            self.plant_prefix(prefix)?;
        }
        Ok(())
    }

    /// Configure the worker pool size; 0 keeps node building inline.
    ///
    /// # Errors
    ///
    /// `IllegalState` once the search has stepped.
    pub fn set_num_workers(&mut self, workers: usize) -> Result<(), SearchError> {
        self.ensure_created("worker count")?;
        self.num_workers = workers;
        Ok(())
    }

    /// Configure the per-node evaluation timeout and an optional fallback
    /// evaluator consulted when the primary one loses the race.
    ///
    /// # Errors
    ///
    /// `IllegalState` once the search has stepped.
    pub fn set_node_evaluation_timeout(
        &mut self,
        after: Duration,
        fallback: Option<Arc<dyn NodeEvaluator<S, A, L>>>,
    ) -> Result<(), SearchError> {
        self.ensure_created("evaluation timeout")?;
        let mut timeout = self.core.timeout.lock();
        timeout.after = Some(after);
        timeout.fallback = fallback;
        Ok(())
    }

    /// Register a push-stream listener for every event the search emits.
    pub fn add_listener(&self, listener: impl SearchListener<S, A, L> + 'static) {
        self.core.add_listener(Box::new(listener));
    }

    /// The label of the node owning `state`, if integrated and labeled.
    #[must_use]
    pub fn label_of(&self, state: &S) -> Option<L> {
        let store = self.core.store.lock();
        store.known(state).and_then(|id| store.node(id)?.label.clone())
    }

    /// Diagnostic annotations of the node owning `state`.
    #[must_use]
    pub fn annotations_of(&self, state: &S) -> Option<HashMap<String, serde_json::Value>> {
        let store = self.core.store.lock();
        store
            .known(state)
            .and_then(|id| Some(store.node(id)?.annotations.clone()))
    }

    /// The root path of the node owning `state`.
    #[must_use]
    pub fn path_to(&self, state: &S) -> Option<SearchPath<S, A>> {
        let store = self.core.store.lock();
        store.known(state).map(|id| store.path(id))
    }

    /// Ids currently on OPEN, best first.
    #[must_use]
    pub fn open_snapshot(&self) -> Vec<NodeId> {
        self.core.store.lock().open_snapshot()
    }

    #[must_use]
    pub fn expanded_count(&self) -> u64 {
        self.core.store.lock().expanded_count()
    }

    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.core.store.lock().created_count()
    }

    /// Number of node-build jobs currently in flight on the pool.
    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.core.active_jobs()
    }

    fn ensure_created(&self, what: &str) -> Result<(), SearchError> {
        if self.status == EngineStatus::Created {
            Ok(())
        } else {
            Err(SearchError::IllegalState {
                detail: format!("{what} can only be configured before the first step"),
            })
        }
    }

    fn activate(&mut self) -> Result<SearchEvent<S, A, L>, SearchError> {
        if self.core.is_canceled() {
            self.terminate();
            return Err(SearchError::Canceled);
        }
        if self.num_workers > 0 && self.pool.is_none() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_workers)
                .thread_name(|i| format!("wayfarer-worker-{i}"))
                .build()
                .map_err(|e| SearchError::IllegalState {
                    detail: format!("worker pool construction failed: {e}"),
                })?;
            self.pool = Some(pool);
        }
        if !self.graph_ready {
            if let Err(err) = self.init_graph() {
                self.terminate();
                return Err(err);
            }
        }
        self.status = EngineStatus::Active;
        debug!(roots = self.roots.len(), workers = self.num_workers, "search activated");
        let event = SearchEvent::Initialized {
            roots: self.roots.clone(),
        };
        self.core.emit(&event);
        Ok(event)
    }

    /// Create, label, and integrate the root frontier.
    fn init_graph(&mut self) -> Result<(), SearchError> {
        let roots = self.core.generator.roots();
        if roots.is_empty() {
            return Err(SearchError::Structural {
                detail: "generator produced no root states".to_string(),
            });
        }
        let mut ids = Vec::new();
        for state in roots {
            let path = SearchPath::root(state.clone());
            let is_goal = self.core.goal.is_goal(&path.states);
            let id = self
                .core
                .store
                .lock()
                .allocate(None, None, state.clone(), is_goal);
            self.core.emit(&SearchEvent::NodeCreated {
                node: id,
                parent: None,
                state,
                is_goal,
            });
            match self.core.label_node(id, &path) {
                LabelOutcome::Labeled(label) => {
                    let status = {
                        let mut store = self.core.store.lock();
                        store.set_label(id, label.clone());
                        store.commit(id)?;
                        if is_goal {
                            store.mark_closed(id);
                            NodeStatus::Closed
                        } else {
                            store.insert_open(id)?;
                            NodeStatus::Open
                        }
                    };
                    self.core
                        .emit(&SearchEvent::NodeStatusSwitched { node: id, status });
                    if is_goal && !self.core.reports_solutions() {
                        let mut solution = EvaluatedSearchPath::new(path, label);
                        if let Some(record) = self.core.store.lock().node(id) {
                            solution.annotations = record.annotations.clone();
                        }
                        self.core.register_solution(solution);
                    }
                    ids.push(id);
                }
                LabelOutcome::Pruned => {}
                LabelOutcome::Canceled => return Err(SearchError::Canceled),
            }
        }
        if ids.is_empty() {
            return Err(SearchError::Structural {
                detail: "no root node could be labeled".to_string(),
            });
        }
        self.roots = ids;
        self.graph_ready = true;
        Ok(())
    }

    fn plant_prefix(&mut self, prefix: EvaluatedSearchPath<S, A, L>) -> Result<(), SearchError> {
        let EvaluatedSearchPath { path, score, .. } = prefix;
        if path.states.is_empty() {
            return Err(SearchError::Structural {
                detail: "bootstrap prefix has no states".to_string(),
            });
        }
        let last = path.states.len() - 1;
        let mut parent: Option<NodeId> = None;
        for (i, state) in path.states.iter().enumerate() {
            let is_leaf = i == last;
            let known = self.core.store.lock().known(state);
            if let Some(existing) = known {
                if is_leaf {
                    // The leaf was integrated before (a cleared root or an
                    // earlier prefix interior): move it back to OPEN with the
                    // recorded score.
                    let (kept_parent, kept_edge) = {
                        let store = self.core.store.lock();
                        let record = store.node(existing).ok_or_else(|| {
                            SearchError::InvariantViolation {
                                detail: format!("state index points at unknown node {existing}"),
                            }
                        })?;
                        (record.parent, record.edge.clone())
                    };
                    self.core
                        .store
                        .lock()
                        .reopen(existing, kept_parent, kept_edge, score.clone())?;
                    self.core.emit(&SearchEvent::NodeStatusSwitched {
                        node: existing,
                        status: NodeStatus::Open,
                    });
                }
                parent = Some(existing);
                continue;
            }
            let edge = if i == 0 {
                None
            } else {
                Some(path.actions[i - 1].clone())
            };
            let is_goal = self.core.goal.is_goal(&path.states[..=i]);
            let (id, status) = {
                let mut store = self.core.store.lock();
                let id = store.allocate(parent, edge, state.clone(), is_goal);
                store.commit(id)?;
                if is_leaf {
                    store.set_label(id, score.clone());
                    store.insert_open(id)?;
                    (id, NodeStatus::Open)
                } else {
                    store.mark_closed(id);
                    (id, NodeStatus::Closed)
                }
            };
            self.core.emit(&SearchEvent::NodeCreated {
                node: id,
                parent,
                state: state.clone(),
                is_goal,
            });
            self.core
                .emit(&SearchEvent::NodeStatusSwitched { node: id, status });
            parent = Some(id);
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<SearchEvent<S, A, L>, SearchError> {
        if self.core.is_canceled() {
            self.terminate();
            return Err(SearchError::Canceled);
        }
        if let Some(err) = self.core.take_fatal() {
            self.terminate();
            return Err(err);
        }
        self.drain_reported();
        if let Some(solution) = self.core.pop_pending() {
            return Ok(SearchEvent::SolutionFound { solution });
        }
        let expanded = match self.expand_next() {
            Ok(event) => event,
            Err(err) => {
                self.terminate();
                return Err(err);
            }
        };
        if let Some(event) = expanded {
            return Ok(event);
        }
        // OPEN exhausted with no jobs in flight: deliver straggler solutions
        // before finishing.
        self.drain_reported();
        if let Some(solution) = self.core.pop_pending() {
            return Ok(SearchEvent::SolutionFound { solution });
        }
        info!(
            expanded = self.core.store.lock().expanded_count(),
            "search space exhausted"
        );
        self.terminate();
        self.core.emit(&SearchEvent::Finished);
        Ok(SearchEvent::Finished)
    }

    /// Move evaluator-announced solutions from the out-of-band channel into
    /// the pending queue. They pass through `register_solution`, so dedup by
    /// goal state applies to them the same as to organic goal reports.
    fn drain_reported(&self) {
        if let Some(rx) = &self.solution_rx {
            for solution in rx.try_iter() {
                self.core.register_solution(solution);
            }
        }
    }

    /// Select and expand the best OPEN node; `Ok(None)` means the search is
    /// over.
    fn expand_next(&mut self) -> Result<Option<SearchEvent<S, A, L>>, SearchError> {
        let Some(node) = self.select_node()? else {
            return Ok(None);
        };
        self.core.emit(&SearchEvent::NodeStatusSwitched {
            node,
            status: NodeStatus::Expanding,
        });

        let state = {
            let store = self.core.store.lock();
            let Some(record) = store.node(node) else {
                return Err(SearchError::InvariantViolation {
                    detail: format!("selected node {node} has no record"),
                });
            };
            record.state.clone()
        };
        let generator = Arc::clone(&self.core.generator);
        let successors =
            catch_unwind(AssertUnwindSafe(|| generator.successors(&state))).map_err(|_| {
                SearchError::Structural {
                    detail: format!("generator panicked while expanding node {node}"),
                }
            })?;
        let count = successors.len();
        self.core.emit(&SearchEvent::SuccessorsComputed {
            node,
            successors: count,
        });

        if count == 0 {
            self.core.store.lock().close(node);
            self.core.emit(&SearchEvent::NodeStatusSwitched {
                node,
                status: NodeStatus::Closed,
            });
        } else {
            let ticket = ExpansionTicket::new(node, count);
            if let Some(pool) = &self.pool {
                for successor in successors {
                    let builder = NodeBuilder {
                        core: Arc::clone(&self.core),
                        ticket: Arc::clone(&ticket),
                        parent: node,
                        successor,
                    };
                    self.core.job_started();
                    let core = Arc::clone(&self.core);
                    pool.spawn(move || {
                        let _job = JobGuard(core);
                        builder.run();
                    });
                }
            } else {
                for successor in successors {
                    NodeBuilder {
                        core: Arc::clone(&self.core),
                        ticket: Arc::clone(&ticket),
                        parent: node,
                        successor,
                    }
                    .run();
                }
                if let Some(err) = self.core.take_fatal() {
                    return Err(err);
                }
                if self.core.is_canceled() {
                    return Err(SearchError::Canceled);
                }
            }
        }
        self.core.store.lock().note_expansion();
        let event = SearchEvent::ExpansionSubmitted {
            node,
            successors: count,
        };
        self.core.emit(&event);
        Ok(Some(event))
    }

    /// Pop the best OPEN node, waiting for in-flight jobs when the pool may
    /// still add nodes, and throttling so at most `num_workers` jobs run.
    fn select_node(&self) -> Result<Option<NodeId>, SearchError> {
        if self.pool.is_none() {
            return Ok(self.core.store.lock().pop_best(None));
        }
        let mut jobs = self.core.jobs.lock();
        loop {
            if self.core.is_canceled() {
                return Err(SearchError::Canceled);
            }
            if let Some(err) = self.core.take_fatal() {
                return Err(err);
            }
            if *jobs >= self.num_workers {
                self.core.jobs_changed.wait(&mut jobs);
                continue;
            }
            if let Some(node) = self.core.store.lock().pop_best(None) {
                return Ok(Some(node));
            }
            if *jobs == 0 {
                return Ok(None);
            }
            self.core.jobs_changed.wait(&mut jobs);
        }
    }

    /// Request cancellation. Idempotent; the next `step()` observes it.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    /// A detachable handle for canceling the search from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle<S, A, L> {
        CancelHandle {
            core: Arc::clone(&self.core),
        }
    }

    fn terminate(&mut self) {
        if self.status == EngineStatus::Terminated {
            return;
        }
        self.status = EngineStatus::Terminated;
        // Shutdown forwards cancellation to the evaluator and drops the pool;
        // detached evaluation threads exit on their own.
        self.core.cancel();
        self.pool = None;
    }
}

impl<S, A, L> Drop for BestFirstSearch<S, A, L> {
    fn drop(&mut self) {
        self.core.cancel();
    }
}

/// Clonable cancellation handle, detached from the engine's lifetime.
pub struct CancelHandle<S, A, L> {
    core: Arc<SearchCore<S, A, L>>,
}

impl<S, A, L> CancelHandle<S, A, L> {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.core.is_canceled()
    }
}

impl<S, A, L> Clone for CancelHandle<S, A, L> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}
