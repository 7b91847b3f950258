//! World implementations for the harness.

pub mod chain;
pub mod diamond;
pub mod lattice;
