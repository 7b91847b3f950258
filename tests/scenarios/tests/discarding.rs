//! Parent-discarding scenarios on the diamond world.
//!
//! Edge weights pick where the rediscovery of `middle` lands (OPEN or
//! CLOSED) and whether the new path is better, so each policy branch is
//! exercised deliberately.

use std::sync::Arc;

use wayfarer_core::config::{ParentDiscarding, SearchConfig};
use wayfarer_core::error::SearchError;
use wayfarer_harness::evaluators::{DepthEvaluator, WeightedCostEvaluator};
use wayfarer_harness::recording::EventLog;
use wayfarer_harness::worlds::diamond::{DiamondWorld, LEFT, MIDDLE, RIGHT, START};
use wayfarer_search::BestFirstSearch;

use scenario_tests::init_logs;

fn diamond_search(
    evaluator: WeightedCostEvaluator,
    discarding: ParentDiscarding,
) -> BestFirstSearch<String, String, i64> {
    BestFirstSearch::new(
        Arc::new(DiamondWorld),
        Arc::new(evaluator),
        SearchConfig {
            parent_discarding: discarding,
            num_workers: 0,
        },
    )
}

#[test]
fn rediscovery_without_discarding_is_structural() {
    init_logs();
    let mut search: BestFirstSearch<String, String, i64> = BestFirstSearch::new(
        Arc::new(DiamondWorld),
        Arc::new(DepthEvaluator),
        SearchConfig::default(),
    );
    let err = loop {
        match search.step() {
            Ok(_) => {}
            Err(err) => break err,
        }
    };
    assert!(matches!(err, SearchError::Structural { .. }));
    assert!(matches!(
        search.step(),
        Err(SearchError::IllegalState { .. })
    ));
}

#[test]
fn open_discarding_keeps_the_better_rediscovery() {
    init_logs();
    // left reaches middle first at cost 11; right rediscovers it at cost 3
    // while it still sits on OPEN.
    let weights = WeightedCostEvaluator::new(1)
        .with("via-left", 1)
        .with("join-left", 10)
        .with("via-right", 2)
        .with("join-right", 1);
    let log: EventLog<String, String, i64> = EventLog::new();
    let mut search = diamond_search(weights, ParentDiscarding::Open);
    search.add_listener(log.clone());

    let solution = search.next_solution().unwrap().expect("solution");
    assert_eq!(solution.path.states[..3], [START, RIGHT, MIDDLE]);
    assert_eq!(solution.score, 4);
    assert!(log.contains_subsequence(&["node_removed"]));
    assert_eq!(search.label_of(&MIDDLE.to_string()), Some(3));
}

#[test]
fn open_discarding_drops_the_worse_rediscovery() {
    init_logs();
    // left reaches middle at cost 2; right's rediscovery costs 7 and loses.
    let weights = WeightedCostEvaluator::new(1)
        .with("via-left", 1)
        .with("join-left", 1)
        .with("via-right", 2)
        .with("join-right", 5);
    let log: EventLog<String, String, i64> = EventLog::new();
    let mut search = diamond_search(weights, ParentDiscarding::Open);
    search.add_listener(log.clone());

    let solution = search.next_solution().unwrap().expect("solution");
    assert_eq!(solution.path.states[..3], [START, LEFT, MIDDLE]);
    assert_eq!(search.label_of(&MIDDLE.to_string()), Some(2));
    assert!(log.contains_subsequence(&["node_removed"]));
}

#[test]
fn all_discarding_reopens_a_closed_node() {
    init_logs();
    // middle closes at cost 2 (via left) and is rediscovered at cost 1 via
    // right's negative-weight join, which must reopen it with a new parent.
    let weights = WeightedCostEvaluator::new(1)
        .with("via-left", 1)
        .with("join-left", 1)
        .with("finish", 1)
        .with("via-right", 3)
        .with("join-right", -2);
    let log: EventLog<String, String, i64> = EventLog::new();
    let mut search = diamond_search(weights, ParentDiscarding::All);
    search.add_listener(log.clone());

    let first = search.next_solution().unwrap().expect("solution");
    assert_eq!(first.score, 3);
    // The goal rediscovered through the reopened middle is consumed without
    // a second report.
    assert_eq!(search.next_solution().unwrap(), None);

    assert!(log.contains_subsequence(&["parent_switched"]));
    assert_eq!(
        search.path_to(&MIDDLE.to_string()).expect("path").states,
        vec![START.to_string(), RIGHT.to_string(), MIDDLE.to_string()]
    );
    assert_eq!(search.label_of(&MIDDLE.to_string()), Some(1));
}

#[test]
fn all_discarding_ignores_a_worse_closed_rediscovery() {
    init_logs();
    let weights = WeightedCostEvaluator::new(1)
        .with("via-left", 1)
        .with("join-left", 1)
        .with("via-right", 3)
        .with("join-right", 3);
    let log: EventLog<String, String, i64> = EventLog::new();
    let mut search = diamond_search(weights, ParentDiscarding::All);
    search.add_listener(log.clone());

    let solution = search.next_solution().unwrap().expect("solution");
    assert_eq!(solution.path.states[..3], [START, LEFT, MIDDLE]);
    assert_eq!(search.next_solution().unwrap(), None);

    assert!(!log.contains_subsequence(&["parent_switched"]));
    assert_eq!(search.label_of(&MIDDLE.to_string()), Some(2));
}
