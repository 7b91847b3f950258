//! Node attachment: the shared engine core and the per-successor build unit.
//!
//! Expanding a node fans out into one [`NodeBuilder`] per successor
//! description. Builders run either inline on the driver thread or on the
//! worker pool; everything they share lives in [`SearchCore`] behind locks.
//! Lock order: the job counter lock is never acquired while the store lock is
//! held.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use wayfarer_core::config::ParentDiscarding;
use wayfarer_core::contract::{GoalTester, GraphGenerator, SuccessorDescription};
use wayfarer_core::error::SearchError;
use wayfarer_core::evaluator::{EvaluationError, NodeEvaluator};
use wayfarer_core::events::{NodeStatus, SearchEvent, SearchListener};
use wayfarer_core::node::NodeId;
use wayfarer_core::path::{EvaluatedSearchPath, SearchPath};

use crate::store::SearchGraphStore;

/// Per-node evaluation timeout configuration.
pub(crate) struct EvalTimeout<S, A, L> {
    /// Deadline for one evaluation; `None` disables the race.
    pub(crate) after: Option<Duration>,
    /// Evaluator consulted inline when the race is lost.
    pub(crate) fallback: Option<Arc<dyn NodeEvaluator<S, A, L>>>,
}

impl<S, A, L> Default for EvalTimeout<S, A, L> {
    fn default() -> Self {
        Self {
            after: None,
            fallback: None,
        }
    }
}

/// What labeling a candidate produced.
pub(crate) enum LabelOutcome<L> {
    /// A label; the candidate proceeds to integration.
    Labeled(L),
    /// No label; the candidate was dropped (status and events already set).
    Pruned,
    /// The evaluator asked for cancellation; the whole search stops.
    Canceled,
}

/// State shared between the driver thread and node-builder workers.
pub(crate) struct SearchCore<S, A, L> {
    pub(crate) store: Mutex<SearchGraphStore<S, A, L>>,
    /// Number of expansion jobs currently in flight on the pool.
    pub(crate) jobs: Mutex<usize>,
    /// Signaled when a job finishes, OPEN gains a node, or the search is
    /// canceled.
    pub(crate) jobs_changed: Condvar,
    canceled: AtomicBool,
    /// Solutions found but not yet returned by `step()`.
    pending: Mutex<VecDeque<EvaluatedSearchPath<S, A, L>>>,
    /// Goal states already reported, for solution deduplication.
    seen_goals: Mutex<HashSet<S>>,
    listeners: Mutex<Vec<Box<dyn SearchListener<S, A, L>>>>,
    /// First unrecoverable error raised by a worker.
    fatal: Mutex<Option<SearchError>>,
    pub(crate) generator: Arc<dyn GraphGenerator<S, A>>,
    pub(crate) evaluator: Arc<dyn NodeEvaluator<S, A, L>>,
    pub(crate) goal: GoalTester<S>,
    discarding: ParentDiscarding,
    pub(crate) timeout: Mutex<EvalTimeout<S, A, L>>,
    /// Whether the evaluator reports solutions itself; suppresses organic
    /// goal reporting so each solution is announced exactly once.
    solution_reporting: bool,
}

impl<S, A, L> SearchCore<S, A, L> {
    pub(crate) fn emit(&self, event: &SearchEvent<S, A, L>) {
        let mut listeners = self.listeners.lock();
        for listener in listeners.iter_mut() {
            listener.on_event(event);
        }
    }

    pub(crate) fn add_listener(&self, listener: Box<dyn SearchListener<S, A, L>>) {
        self.listeners.lock().push(listener);
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Flag cancellation, forward it to a cancelable evaluator, and wake
    /// every waiter. Idempotent.
    pub(crate) fn cancel(&self) {
        if self.canceled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("search canceled");
        if let Some(cancelable) = self.evaluator.as_cancelable() {
            cancelable.cancel_evaluation();
        }
        self.jobs_changed.notify_all();
    }

    /// Record a worker-side unrecoverable error. The first one wins.
    pub(crate) fn set_fatal(&self, err: SearchError) {
        warn!(error = %err, "unrecoverable error during node attachment");
        let mut slot = self.fatal.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.jobs_changed.notify_all();
    }

    pub(crate) fn take_fatal(&self) -> Option<SearchError> {
        self.fatal.lock().take()
    }

    pub(crate) fn job_started(&self) {
        *self.jobs.lock() += 1;
    }

    pub(crate) fn active_jobs(&self) -> usize {
        *self.jobs.lock()
    }

    pub(crate) fn reports_solutions(&self) -> bool {
        self.solution_reporting
    }

    pub(crate) fn pop_pending(&self) -> Option<EvaluatedSearchPath<S, A, L>> {
        self.pending.lock().pop_front()
    }
}

impl<S, A, L> SearchCore<S, A, L>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        generator: Arc<dyn GraphGenerator<S, A>>,
        evaluator: Arc<dyn NodeEvaluator<S, A, L>>,
        discarding: ParentDiscarding,
        solution_reporting: bool,
    ) -> Self {
        let goal = generator.goal_tester();
        Self {
            store: Mutex::new(SearchGraphStore::new()),
            jobs: Mutex::new(0),
            jobs_changed: Condvar::new(),
            canceled: AtomicBool::new(false),
            pending: Mutex::new(VecDeque::new()),
            seen_goals: Mutex::new(HashSet::new()),
            listeners: Mutex::new(Vec::new()),
            fatal: Mutex::new(None),
            generator,
            evaluator,
            goal,
            discarding,
            timeout: Mutex::new(EvalTimeout::default()),
            solution_reporting,
        }
    }

    /// Queue a solution for delivery, deduplicated by goal state. Listeners
    /// see the `SolutionFound` event immediately; `step()` returns it when
    /// the driver drains the queue.
    pub(crate) fn register_solution(&self, solution: EvaluatedSearchPath<S, A, L>) {
        let Some(goal_state) = solution.path.leaf().cloned() else {
            return;
        };
        if !self.seen_goals.lock().insert(goal_state) {
            return;
        }
        self.emit(&SearchEvent::SolutionFound {
            solution: solution.clone(),
        });
        self.pending.lock().push_back(solution);
    }

    /// Compute the label for an allocated candidate, racing the evaluator
    /// against the configured timeout. Unlabelable candidates are dropped
    /// here: status set, cause annotated, status event emitted.
    pub(crate) fn label_node(&self, id: NodeId, path: &SearchPath<S, A>) -> LabelOutcome<L> {
        let (after, fallback) = {
            let timeout = self.timeout.lock();
            (timeout.after, timeout.fallback.clone())
        };
        let started = Instant::now();
        let result = match after {
            Some(after) => evaluate_raced(Arc::clone(&self.evaluator), path.clone(), after),
            None => evaluate_contained(self.evaluator.as_ref(), path),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.store
            .lock()
            .annotate(id, "f_time", serde_json::Value::from(elapsed_ms));

        match result {
            Ok(label) => LabelOutcome::Labeled(label),
            Err(EvaluationError::NoValue) => {
                self.drop_candidate(id, NodeStatus::Pruned, None);
                LabelOutcome::Pruned
            }
            Err(EvaluationError::Timeout(after)) => {
                warn!(node = %id, ?after, "evaluation timed out");
                if let Some(fallback) = fallback {
                    if let Ok(label) = evaluate_contained(fallback.as_ref(), path) {
                        self.store.lock().annotate(
                            id,
                            "f_error",
                            serde_json::Value::String(format!(
                                "timed out after {after:?}; fallback value used"
                            )),
                        );
                        return LabelOutcome::Labeled(label);
                    }
                }
                self.drop_candidate(
                    id,
                    NodeStatus::TimedOut,
                    Some(format!("evaluation timed out after {after:?}")),
                );
                LabelOutcome::Pruned
            }
            Err(EvaluationError::Failed { detail }) => {
                self.drop_candidate(id, NodeStatus::Failed, Some(detail));
                LabelOutcome::Pruned
            }
            Err(EvaluationError::Canceled) => {
                self.cancel();
                LabelOutcome::Canceled
            }
        }
    }

    fn drop_candidate(&self, id: NodeId, status: NodeStatus, error: Option<String>) {
        {
            let mut store = self.store.lock();
            if let Some(detail) = error {
                store.annotate(id, "f_error", serde_json::Value::String(detail));
            }
            store.set_status(id, status);
        }
        debug!(node = %id, ?status, "candidate dropped without a label");
        self.emit(&SearchEvent::NodeStatusSwitched { node: id, status });
    }

    /// Attach a labeled candidate to the graph, applying the configured
    /// parent-discarding rule when its state is already known.
    ///
    /// # Errors
    ///
    /// `Structural` when a rediscovery cannot be consumed by the policy;
    /// `InvariantViolation` when the store rejects a transition.
    fn integrate(
        &self,
        id: NodeId,
        parent: NodeId,
        successor: &SuccessorDescription<S, A>,
        label: &L,
        is_goal: bool,
    ) -> Result<(), SearchError> {
        let mut events: Vec<SearchEvent<S, A, L>> = Vec::new();
        let mut opened = false;
        {
            let mut store = self.store.lock();
            store.set_label(id, label.clone());
            match store.known(&successor.state) {
                None => {
                    store.commit(id)?;
                    if is_goal {
                        // goals are terminal and never enter OPEN
                        store.mark_closed(id);
                        events.push(SearchEvent::NodeStatusSwitched {
                            node: id,
                            status: NodeStatus::Closed,
                        });
                    } else {
                        store.insert_open(id)?;
                        opened = true;
                        events.push(SearchEvent::NodeStatusSwitched {
                            node: id,
                            status: NodeStatus::Open,
                        });
                    }
                }
                Some(existing) => {
                    let record = store.node(existing).ok_or_else(|| {
                        SearchError::InvariantViolation {
                            detail: format!("state index points at unknown node {existing}"),
                        }
                    })?;
                    let existing_status = record.status;
                    let existing_label = record.label.clone();
                    let existing_parent = record.parent;
                    let existing_goal = record.is_goal;
                    let better = existing_label.map_or(true, |l| *label < l);

                    match (self.discarding, existing_status) {
                        (ParentDiscarding::None, _) => {
                            return Err(SearchError::Structural {
                                detail: format!(
                                    "state of node {id} was already reached by node {existing} \
                                     and parent discarding is disabled"
                                ),
                            });
                        }
                        // Goals are terminal; a rediscovered goal is consumed
                        // without reopening (solutions deduplicate by state).
                        (_, _) if existing_goal => {
                            events.push(SearchEvent::NodeRemoved { node: id });
                            store.discard(id);
                        }
                        (_, NodeStatus::Open) => {
                            if better {
                                store.remove_from_open(existing)?;
                                store.evict(existing);
                                events.push(SearchEvent::NodeRemoved { node: existing });
                                store.commit(id)?;
                                store.insert_open(id)?;
                                opened = true;
                                events.push(SearchEvent::NodeStatusSwitched {
                                    node: id,
                                    status: NodeStatus::Open,
                                });
                            } else {
                                events.push(SearchEvent::NodeRemoved { node: id });
                                store.discard(id);
                            }
                        }
                        (ParentDiscarding::All, NodeStatus::Closed) => {
                            if better {
                                store.reopen(
                                    existing,
                                    Some(parent),
                                    Some(successor.action.clone()),
                                    label.clone(),
                                )?;
                                opened = true;
                                events.push(SearchEvent::ParentSwitched {
                                    node: existing,
                                    old_parent: existing_parent,
                                    new_parent: Some(parent),
                                });
                                events.push(SearchEvent::NodeStatusSwitched {
                                    node: existing,
                                    status: NodeStatus::Open,
                                });
                            }
                            events.push(SearchEvent::NodeRemoved { node: id });
                            store.discard(id);
                        }
                        // Rediscovery arrived after the owner left OPEN (it
                        // is mid-expansion, or closed under Open discarding):
                        // too late to swap parents, the candidate is dropped.
                        _ => {
                            events.push(SearchEvent::NodeRemoved { node: id });
                            store.discard(id);
                        }
                    }
                }
            }
        }
        for event in &events {
            self.emit(event);
        }
        if opened {
            self.jobs_changed.notify_all();
        }
        Ok(())
    }
}

/// Run an evaluator with panic containment: a panicking evaluator prunes its
/// node instead of tearing down a worker thread.
fn evaluate_contained<S, A, L>(
    evaluator: &dyn NodeEvaluator<S, A, L>,
    path: &SearchPath<S, A>,
) -> Result<L, EvaluationError> {
    catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(path))).unwrap_or_else(|_| {
        Err(EvaluationError::Failed {
            detail: "evaluator panicked".to_string(),
        })
    })
}

/// Race one evaluation against a deadline on a dedicated thread. A losing
/// evaluation keeps running detached; its result is dropped with the channel.
fn evaluate_raced<S, A, L>(
    evaluator: Arc<dyn NodeEvaluator<S, A, L>>,
    path: SearchPath<S, A>,
    after: Duration,
) -> Result<L, EvaluationError>
where
    S: Send + 'static,
    A: Send + 'static,
    L: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("wayfarer-eval".to_string())
        .spawn(move || {
            let result = evaluate_contained(evaluator.as_ref(), &path);
            let _ = tx.send(result);
        });
    if spawned.is_err() {
        return Err(EvaluationError::Failed {
            detail: "could not spawn evaluation thread".to_string(),
        });
    }
    match rx.recv_timeout(after) {
        Ok(result) => result,
        Err(_) => Err(EvaluationError::Timeout(after)),
    }
}

/// Countdown over one expansion: the expanded node is closed when the last
/// successor's build unit finishes.
pub(crate) struct ExpansionTicket {
    node: NodeId,
    remaining: AtomicUsize,
}

impl ExpansionTicket {
    pub(crate) fn new(node: NodeId, successors: usize) -> Arc<Self> {
        Arc::new(Self {
            node,
            remaining: AtomicUsize::new(successors),
        })
    }
}

/// RAII arm of an [`ExpansionTicket`]: decrements on every exit path of a
/// build unit, including panics and early returns.
pub(crate) struct TicketGuard<S, A, L>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    pub(crate) core: Arc<SearchCore<S, A, L>>,
    pub(crate) ticket: Arc<ExpansionTicket>,
}

impl<S, A, L> Drop for TicketGuard<S, A, L>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.ticket.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.core.store.lock().close(self.ticket.node);
            self.core.emit(&SearchEvent::NodeStatusSwitched {
                node: self.ticket.node,
                status: NodeStatus::Closed,
            });
        }
    }
}

/// RAII job-counter decrement for pooled build units. The driver's throttle
/// and termination checks rely on the counter returning to zero on every
/// path.
pub(crate) struct JobGuard<S, A, L>(pub(crate) Arc<SearchCore<S, A, L>>);

impl<S, A, L> Drop for JobGuard<S, A, L> {
    fn drop(&mut self) {
        let mut jobs = self.0.jobs.lock();
        *jobs = jobs.saturating_sub(1);
        drop(jobs);
        self.0.jobs_changed.notify_all();
    }
}

/// One unit of node attachment: evaluate and integrate a single successor of
/// an expanding node.
pub(crate) struct NodeBuilder<S, A, L>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    pub(crate) core: Arc<SearchCore<S, A, L>>,
    pub(crate) ticket: Arc<ExpansionTicket>,
    pub(crate) parent: NodeId,
    pub(crate) successor: SuccessorDescription<S, A>,
}

impl<S, A, L> NodeBuilder<S, A, L>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    pub(crate) fn run(self) {
        let Self {
            core,
            ticket,
            parent,
            successor,
        } = self;
        let _ticket = TicketGuard {
            core: Arc::clone(&core),
            ticket,
        };
        if let Err(err) = build(&core, parent, &successor) {
            core.set_fatal(err);
        }
    }
}

fn build<S, A, L>(
    core: &Arc<SearchCore<S, A, L>>,
    parent: NodeId,
    successor: &SuccessorDescription<S, A>,
) -> Result<(), SearchError>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    L: Ord + Clone + Send + Sync + 'static,
{
    if core.is_canceled() {
        return Ok(());
    }

    let mut path = core.store.lock().path(parent);
    path.states.push(successor.state.clone());
    path.actions.push(successor.action.clone());
    let is_goal = core.goal.is_goal(&path.states);

    let id = core.store.lock().allocate(
        Some(parent),
        Some(successor.action.clone()),
        successor.state.clone(),
        is_goal,
    );
    core.emit(&SearchEvent::NodeCreated {
        node: id,
        parent: Some(parent),
        state: successor.state.clone(),
        is_goal,
    });

    let label = match core.label_node(id, &path) {
        LabelOutcome::Labeled(label) => label,
        LabelOutcome::Pruned | LabelOutcome::Canceled => return Ok(()),
    };

    core.integrate(id, parent, successor, &label, is_goal)?;

    if is_goal && !core.solution_reporting {
        let mut solution = EvaluatedSearchPath::new(path, label);
        if let Some(record) = core.store.lock().node(id) {
            solution.annotations = record.annotations.clone();
        }
        core.register_solution(solution);
    }
    Ok(())
}
