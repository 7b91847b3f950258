//! The search graph store: OPEN, CLOSED, EXPANDING, and the external-state
//! index.
//!
//! OPEN is a `BTreeSet` keyed by `(label, id)` rather than a binary heap so
//! that parent discarding and reopening can remove arbitrary elements in
//! `O(log n)` instead of a linear scan. The store itself is single-threaded;
//! the engine serializes access behind one mutex.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use wayfarer_core::events::NodeStatus;
use wayfarer_core::node::NodeId;
use wayfarer_core::path::SearchPath;
use wayfarer_core::SearchError;

use crate::node::{NodeRecord, OpenKey};

/// Bookkeeping for one search run.
///
/// Integrated nodes are never deleted: the store is the full search history.
/// A node is in at most one of OPEN/CLOSED/EXPANDING at any time; allocated
/// but not yet integrated candidates are in none of them.
pub struct SearchGraphStore<S, A, L> {
    nodes: HashMap<NodeId, NodeRecord<S, A, L>>,
    /// External state → internal node, for integrated nodes only.
    ext2int: HashMap<S, NodeId>,
    open: BTreeSet<OpenKey<L>>,
    closed: HashSet<NodeId>,
    /// Node → worker thread index (`None` for the driver thread).
    expanding: HashMap<NodeId, Option<usize>>,
    next_id: u64,
    expanded_count: u64,
}

impl<S, A, L> SearchGraphStore<S, A, L>
where
    S: Clone + Eq + Hash,
    A: Clone,
    L: Ord + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            ext2int: HashMap::new(),
            open: BTreeSet::new(),
            closed: HashSet::new(),
            expanding: HashMap::new(),
            next_id: 0,
            expanded_count: 0,
        }
    }

    /// Create a record for a freshly reached state. The node is not yet
    /// integrated: it is in none of OPEN/CLOSED/EXPANDING and absent from the
    /// external-state index until [`Self::commit`].
    pub fn allocate(
        &mut self,
        parent: Option<NodeId>,
        edge: Option<A>,
        state: S,
        is_goal: bool,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeRecord {
                id,
                parent,
                edge,
                state,
                label: None,
                is_goal,
                annotations: HashMap::new(),
                status: NodeStatus::Created,
            },
        );
        id
    }

    /// Register an allocated node in the external-state index.
    ///
    /// # Errors
    ///
    /// `Structural` if another node already owns this state — under the
    /// tree-search assumption a state is reached exactly once unless a
    /// parent-discarding rule consumed the rediscovery first.
    pub fn commit(&mut self, id: NodeId) -> Result<(), SearchError> {
        let Some(record) = self.nodes.get(&id) else {
            return Err(SearchError::InvariantViolation {
                detail: format!("commit of unknown node {id}"),
            });
        };
        if let Some(existing) = self.ext2int.get(&record.state) {
            return Err(SearchError::Structural {
                detail: format!(
                    "state of node {id} was already reached by node {existing} (tree search \
                     supports at most one node per state)"
                ),
            });
        }
        self.ext2int.insert(record.state.clone(), id);
        Ok(())
    }

    /// Drop an allocated-but-never-integrated candidate record.
    pub(crate) fn discard(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    /// Remove an integrated node entirely (it lost a parent-discarding
    /// comparison and is replaced by a better candidate). The caller must
    /// have removed it from OPEN already.
    pub(crate) fn evict(&mut self, id: NodeId) {
        if let Some(record) = self.nodes.remove(&id) {
            self.ext2int.remove(&record.state);
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord<S, A, L>> {
        self.nodes.get(&id)
    }

    /// Look up the integrated node owning a state, if any.
    #[must_use]
    pub fn known(&self, state: &S) -> Option<NodeId> {
        self.ext2int.get(state).copied()
    }

    pub fn set_label(&mut self, id: NodeId, label: L) {
        if let Some(record) = self.nodes.get_mut(&id) {
            debug_assert!(
                record.status != NodeStatus::Open,
                "labels of nodes on OPEN are immutable"
            );
            record.label = Some(label);
        }
    }

    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        if let Some(record) = self.nodes.get_mut(&id) {
            record.status = status;
        }
    }

    pub fn annotate(&mut self, id: NodeId, key: &str, value: serde_json::Value) {
        if let Some(record) = self.nodes.get_mut(&id) {
            record.annotations.insert(key.to_string(), value);
        }
    }

    /// Insert a labeled, integrated node into OPEN.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if the node has no label — an unlabeled node must
    /// never reach OPEN — or is unknown.
    pub fn insert_open(&mut self, id: NodeId) -> Result<(), SearchError> {
        let Some(record) = self.nodes.get_mut(&id) else {
            return Err(SearchError::InvariantViolation {
                detail: format!("OPEN insertion of unknown node {id}"),
            });
        };
        let Some(label) = record.label.clone() else {
            return Err(SearchError::InvariantViolation {
                detail: format!("cannot insert unlabeled node {id} into OPEN"),
            });
        };
        debug_assert!(
            !self.closed.contains(&id) && !self.expanding.contains_key(&id),
            "node entering OPEN must not be in CLOSED or EXPANDING"
        );
        record.status = NodeStatus::Open;
        self.open.insert(OpenKey { label, id });
        Ok(())
    }

    /// Remove a node from OPEN without expanding it (parent discarding).
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if the node is not on OPEN.
    pub fn remove_from_open(&mut self, id: NodeId) -> Result<(), SearchError> {
        let key = self
            .nodes
            .get(&id)
            .and_then(|r| r.label.clone())
            .map(|label| OpenKey { label, id });
        if !key.is_some_and(|k| self.open.remove(&k)) {
            return Err(SearchError::InvariantViolation {
                detail: format!("removal of node {id} which is not on OPEN"),
            });
        }
        Ok(())
    }

    /// Pop the minimum-label node from OPEN and move it to EXPANDING in the
    /// same transition, so it can never be selected twice.
    pub fn pop_best(&mut self, worker: Option<usize>) -> Option<NodeId> {
        let key = self.open.pop_first()?;
        self.expanding.insert(key.id, worker);
        if let Some(record) = self.nodes.get_mut(&key.id) {
            record.status = NodeStatus::Expanding;
        }
        Some(key.id)
    }

    /// Move a node from EXPANDING to CLOSED.
    pub fn close(&mut self, id: NodeId) {
        self.expanding.remove(&id);
        self.mark_closed(id);
    }

    /// Put a node directly into CLOSED (bootstrap prefixes, cleared roots).
    pub(crate) fn mark_closed(&mut self, id: NodeId) {
        self.closed.insert(id);
        if let Some(record) = self.nodes.get_mut(&id) {
            record.status = NodeStatus::Closed;
        }
    }

    /// Reopen a CLOSED node that was rediscovered with a strictly better
    /// label: overwrite its parent, edge, and label, and move it back to
    /// OPEN. This is the only transition that mutates a closed node.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if the node is not in CLOSED.
    pub fn reopen(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        edge: Option<A>,
        label: L,
    ) -> Result<(), SearchError> {
        if !self.closed.remove(&id) {
            return Err(SearchError::InvariantViolation {
                detail: format!("reopening of node {id} which is not in CLOSED"),
            });
        }
        let Some(record) = self.nodes.get_mut(&id) else {
            return Err(SearchError::InvariantViolation {
                detail: format!("reopening of unknown node {id}"),
            });
        };
        record.parent = parent;
        record.edge = edge;
        record.label = Some(label);
        self.insert_open(id)
    }

    /// Reconstruct the root path of a node by following parent links.
    #[must_use]
    pub fn path(&self, id: NodeId) -> SearchPath<S, A> {
        let mut states = Vec::new();
        let mut actions = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(record) = self.nodes.get(&current) else {
                break;
            };
            states.push(record.state.clone());
            if let Some(edge) = &record.edge {
                actions.push(edge.clone());
            }
            cursor = record.parent;
        }
        states.reverse();
        actions.reverse();
        SearchPath { states, actions }
    }

    #[must_use]
    pub fn open_is_empty(&self) -> bool {
        self.open.is_empty()
    }

    #[must_use]
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    /// Ids currently on OPEN, best first.
    #[must_use]
    pub fn open_snapshot(&self) -> Vec<NodeId> {
        self.open.iter().map(|k| k.id).collect()
    }

    /// Drain OPEN, moving everything in it to CLOSED (bootstrap replaces the
    /// root frontier with prefix leaves).
    pub(crate) fn clear_open(&mut self) {
        let drained: Vec<NodeId> = self.open.iter().map(|k| k.id).collect();
        self.open.clear();
        for id in drained {
            self.mark_closed(id);
        }
    }

    pub(crate) fn note_expansion(&mut self) {
        self.expanded_count += 1;
    }

    /// Number of completed node expansions.
    #[must_use]
    pub fn expanded_count(&self) -> u64 {
        self.expanded_count
    }

    /// Number of nodes ever created (including discarded candidates).
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.next_id
    }
}

impl<S, A, L> Default for SearchGraphStore<S, A, L>
where
    S: Clone + Eq + Hash,
    A: Clone,
    L: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
