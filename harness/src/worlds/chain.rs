//! `ChainWorld`: a linear graph with one forward edge per state.
//!
//! States are `0..=length`; the single goal sits at `length`. Useful as the
//! smallest deterministic world for protocol and lifecycle assertions.

use wayfarer_core::contract::{GoalTester, GraphGenerator, SuccessorDescription};

/// Linear chain of `length` edges.
pub struct ChainWorld {
    pub length: u32,
}

impl GraphGenerator<u32, String> for ChainWorld {
    fn roots(&self) -> Vec<u32> {
        vec![0]
    }

    fn successors(&self, state: &u32) -> Vec<SuccessorDescription<u32, String>> {
        if *state >= self.length {
            Vec::new()
        } else {
            vec![SuccessorDescription {
                state: state + 1,
                action: format!("to-{}", state + 1),
            }]
        }
    }

    fn goal_tester(&self) -> GoalTester<u32> {
        let goal = self.length;
        GoalTester::node(move |s| *s == goal)
    }
}
