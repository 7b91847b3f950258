//! `DiamondWorld`: two paths from the start converge on the same middle
//! state before the goal.
//!
//! ```text
//!        start
//!  via-left   via-right
//!     left       right
//!  join-left  join-right
//!         middle
//!         finish
//!          goal
//! ```
//!
//! The convergence at `middle` makes this the canonical world for
//! parent-discarding behavior: with cost-based labels, the edge weights
//! decide whether the rediscovery arrives while `middle` is still on OPEN or
//! already closed, and whether it is better or worse.

use wayfarer_core::contract::{GoalTester, GraphGenerator, SuccessorDescription};

pub const START: &str = "start";
pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";
pub const MIDDLE: &str = "middle";
pub const GOAL: &str = "goal";

/// Fixed diamond topology over string states.
pub struct DiamondWorld;

impl GraphGenerator<String, String> for DiamondWorld {
    fn roots(&self) -> Vec<String> {
        vec![START.to_string()]
    }

    fn successors(&self, state: &String) -> Vec<SuccessorDescription<String, String>> {
        let edges: &[(&str, &str)] = match state.as_str() {
            START => &[(LEFT, "via-left"), (RIGHT, "via-right")],
            LEFT => &[(MIDDLE, "join-left")],
            RIGHT => &[(MIDDLE, "join-right")],
            MIDDLE => &[(GOAL, "finish")],
            _ => &[],
        };
        edges
            .iter()
            .map(|(target, action)| SuccessorDescription {
                state: (*target).to_string(),
                action: (*action).to_string(),
            })
            .collect()
    }

    fn goal_tester(&self) -> GoalTester<String> {
        GoalTester::node(|s: &String| s == GOAL)
    }
}
