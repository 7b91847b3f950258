//! Wayfarer Harness: deterministic worlds, evaluators, and recording
//! listeners for exercising the search engine.
//!
//! Everything here is test infrastructure: small implicit graphs with known
//! topology, evaluators with controllable behavior (costs, delays, pruning,
//! capabilities), and an event log for asserting on the push stream.

#![forbid(unsafe_code)]

pub mod evaluators;
pub mod recording;
pub mod worlds;
