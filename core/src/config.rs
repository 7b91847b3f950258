//! Search configuration.

/// Policy for handling rediscovery of an already-known state via a different
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentDiscarding {
    /// No discarding: a rediscovered state is a structural error under the
    /// tree-search assumption.
    #[default]
    None,
    /// If the state already sits on OPEN, keep only the better-labeled node.
    Open,
    /// As `Open`, plus: a strictly better rediscovery of a CLOSED node
    /// reopens it (parent and label overwritten, moved back to OPEN).
    All,
}

/// Engine configuration fixed at construction time.
///
/// The per-node evaluation timeout is configured separately on the engine
/// (it carries a generic fallback evaluator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Rediscovery policy.
    pub parent_discarding: ParentDiscarding,
    /// Worker pool size for node attachment; 0 runs node building inline on
    /// the driver thread. Fixed once per search run.
    pub num_workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parent_discarding: ParentDiscarding::None,
            num_workers: 0,
        }
    }
}
