//! `LatticeWorld`: a grid with right/down moves, goal in the far corner.
//!
//! Every interior cell is reachable along several monotone paths, so a run
//! over this world exercises rediscovery on a larger scale than the diamond.
//! With depth labels, rediscoveries always hit OPEN nodes of equal depth.

use wayfarer_core::contract::{GoalTester, GraphGenerator, SuccessorDescription};

/// `width` x `height` grid over `(x, y)` states rooted at `(0, 0)`.
pub struct LatticeWorld {
    pub width: u32,
    pub height: u32,
}

impl GraphGenerator<(u32, u32), String> for LatticeWorld {
    fn roots(&self) -> Vec<(u32, u32)> {
        vec![(0, 0)]
    }

    fn successors(&self, state: &(u32, u32)) -> Vec<SuccessorDescription<(u32, u32), String>> {
        let (x, y) = *state;
        let mut out = Vec::new();
        if x + 1 < self.width {
            out.push(SuccessorDescription {
                state: (x + 1, y),
                action: "right".to_string(),
            });
        }
        if y + 1 < self.height {
            out.push(SuccessorDescription {
                state: (x, y + 1),
                action: "down".to_string(),
            });
        }
        out
    }

    fn goal_tester(&self) -> GoalTester<(u32, u32)> {
        let corner = (self.width - 1, self.height - 1);
        GoalTester::node(move |s| *s == corner)
    }
}
