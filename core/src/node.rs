//! Node identity.

/// Identity of an internal search node.
///
/// Ids are assigned monotonically by the search-graph store in creation
/// order, which makes them the deterministic tie-breaker for OPEN ordering:
/// two nodes with equal labels pop in insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}
