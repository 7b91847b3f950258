//! Worker-pool scenarios: pooled runs agree with inline runs, the job
//! counter drains, and expansion order respects labels.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wayfarer_core::config::{ParentDiscarding, SearchConfig};
use wayfarer_core::error::SearchError;
use wayfarer_core::events::{NodeStatus, SearchEvent};
use wayfarer_core::node::NodeId;
use wayfarer_harness::evaluators::DepthEvaluator;
use wayfarer_harness::recording::EventLog;
use wayfarer_harness::worlds::diamond::DiamondWorld;
use wayfarer_harness::worlds::lattice::LatticeWorld;
use wayfarer_search::BestFirstSearch;

use scenario_tests::init_logs;

fn lattice_search(workers: usize) -> BestFirstSearch<(u32, u32), String, i64> {
    BestFirstSearch::new(
        Arc::new(LatticeWorld {
            width: 4,
            height: 4,
        }),
        Arc::new(DepthEvaluator),
        SearchConfig {
            parent_discarding: ParentDiscarding::Open,
            num_workers: workers,
        },
    )
}

#[test]
fn pooled_run_agrees_with_inline_run() {
    init_logs();
    let mut inline = lattice_search(0);
    let mut pooled = lattice_search(3);

    let a = inline.next_solution().unwrap().expect("inline solution");
    let b = pooled.next_solution().unwrap().expect("pooled solution");

    assert_eq!(a.score, 6);
    assert_eq!(b.score, 6);
    assert_eq!(a.path.states.len(), 7);
    assert_eq!(b.path.states.len(), 7);
    assert_eq!(pooled.next_solution().unwrap(), None);
    assert_eq!(pooled.active_jobs(), 0);
}

#[test]
fn expansion_order_never_decreases_in_label() {
    init_logs();
    let log: EventLog<(u32, u32), String, i64> = EventLog::new();
    let mut search = lattice_search(0);
    search.add_listener(log.clone());
    while search.next_solution().unwrap().is_some() {}

    // Depth labels on the lattice equal x + y of the created state.
    let mut state_of: HashMap<NodeId, (u32, u32)> = HashMap::new();
    let mut expanded_depths = Vec::new();
    for event in log.snapshot() {
        match event {
            SearchEvent::NodeCreated { node, state, .. } => {
                state_of.insert(node, state);
            }
            SearchEvent::NodeStatusSwitched {
                node,
                status: NodeStatus::Expanding,
            } => {
                let (x, y) = state_of[&node];
                expanded_depths.push(x + y);
            }
            _ => {}
        }
    }
    assert!(!expanded_depths.is_empty());
    assert!(expanded_depths.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn worker_error_surfaces_and_jobs_drain() {
    init_logs();
    let mut search: BestFirstSearch<String, String, i64> = BestFirstSearch::new(
        Arc::new(DiamondWorld),
        Arc::new(DepthEvaluator),
        SearchConfig {
            parent_discarding: ParentDiscarding::None,
            num_workers: 2,
        },
    );
    let err = loop {
        match search.step() {
            Ok(_) => {}
            Err(err) => break err,
        }
    };
    assert!(matches!(err, SearchError::Structural { .. }));

    // In-flight builders may still be unwinding when the error surfaces.
    let deadline = Instant::now() + Duration::from_secs(2);
    while search.active_jobs() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(search.active_jobs(), 0);
}
