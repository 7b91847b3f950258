//! Typed engine errors.
//!
//! `SearchError` covers the fatal and control-flow terminations of a search.
//! Per-node evaluation failures are a separate, mostly recoverable taxonomy
//! ([`crate::evaluator::EvaluationError`]); normal exhaustion of the search
//! space is the `Finished` event, never an error.

use thiserror::Error;

/// Fatal or control-flow failure of the search engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The graph generator produced malformed output, e.g. an empty root set
    /// or a second path to an already-known state under tree-search rules.
    /// Aborts initialization or the current expansion.
    #[error("malformed graph generator output: {detail}")]
    Structural { detail: String },

    /// An internal bookkeeping invariant was violated, e.g. an attempt to
    /// insert an unlabeled node into OPEN. Indicates a bug in the engine or
    /// an ill-behaved collaborator; never silently swallowed.
    #[error("search invariant violated: {detail}")]
    InvariantViolation { detail: String },

    /// The search was canceled. Distinct from a normal finish; the engine has
    /// shut down its worker pool and will not make further progress.
    #[error("search canceled")]
    Canceled,

    /// The step protocol was driven in an illegal state, e.g. `step()` after
    /// termination or `bootstrap()` after initialization.
    #[error("illegal engine state: {detail}")]
    IllegalState { detail: String },
}
