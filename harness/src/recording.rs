//! Event recording for assertions on the push stream.

use std::sync::Arc;

use parking_lot::Mutex;

use wayfarer_core::events::{NodeStatus, SearchEvent, SearchListener};
use wayfarer_core::node::NodeId;

/// Shared, clonable event log. Register a clone as a listener and assert on
/// the original after the run.
pub struct EventLog<S, A, L> {
    events: Arc<Mutex<Vec<SearchEvent<S, A, L>>>>,
}

impl<S, A, L> EventLog<S, A, L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Event kind names in emission order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(event_name).collect()
    }

    /// Whether `expected` occurs as an ordered (not necessarily contiguous)
    /// subsequence of the recorded event kinds.
    #[must_use]
    pub fn contains_subsequence(&self, expected: &[&str]) -> bool {
        let names = self.names();
        let mut want = expected.iter();
        let mut next = want.next();
        for name in names {
            if Some(&name) == next {
                next = want.next();
            }
        }
        next.is_none()
    }

    /// Status history of one node, in emission order.
    #[must_use]
    pub fn statuses_of(&self, node: NodeId) -> Vec<NodeStatus> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SearchEvent::NodeStatusSwitched { node: n, status } if *n == node => Some(*status),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl<S: Clone, A: Clone, L: Clone> EventLog<S, A, L> {
    /// A copy of every recorded event.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SearchEvent<S, A, L>> {
        self.events.lock().clone()
    }
}

impl<S, A, L> Default for EventLog<S, A, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, L> Clone for EventLog<S, A, L> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<S, A, L> SearchListener<S, A, L> for EventLog<S, A, L>
where
    S: Clone + Send,
    A: Clone + Send,
    L: Clone + Send,
{
    fn on_event(&mut self, event: &SearchEvent<S, A, L>) {
        self.events.lock().push(event.clone());
    }
}

fn event_name<S, A, L>(event: &SearchEvent<S, A, L>) -> &'static str {
    match event {
        SearchEvent::Initialized { .. } => "initialized",
        SearchEvent::NodeCreated { .. } => "node_created",
        SearchEvent::NodeStatusSwitched { .. } => "status_switched",
        SearchEvent::NodeRemoved { .. } => "node_removed",
        SearchEvent::ParentSwitched { .. } => "parent_switched",
        SearchEvent::SuccessorsComputed { .. } => "successors_computed",
        SearchEvent::ExpansionSubmitted { .. } => "expansion_submitted",
        SearchEvent::SolutionFound { .. } => "solution_found",
        SearchEvent::Finished => "finished",
    }
}
