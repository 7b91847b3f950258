//! Evaluation failure scenarios: timeouts, fallback labels, errors, and
//! silent pruning.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wayfarer_core::config::SearchConfig;
use wayfarer_core::evaluator::EvaluationError;
use wayfarer_core::events::{NodeStatus, SearchEvent};
use wayfarer_core::path::SearchPath;
use wayfarer_harness::evaluators::{DepthEvaluator, FnEvaluator};
use wayfarer_harness::recording::EventLog;
use wayfarer_harness::worlds::chain::ChainWorld;
use wayfarer_search::BestFirstSearch;

use scenario_tests::init_logs;

fn depth(path: &SearchPath<u32, String>) -> i64 {
    i64::try_from(path.depth()).unwrap_or(i64::MAX)
}

/// Depth labels, except state 1 stalls for 300ms.
fn stalling_on_one() -> FnEvaluator<impl Fn(&SearchPath<u32, String>) -> Result<i64, EvaluationError> + Send + Sync>
{
    FnEvaluator(|path: &SearchPath<u32, String>| {
        if path.leaf() == Some(&1) {
            thread::sleep(Duration::from_millis(300));
        }
        Ok(depth(path))
    })
}

fn dropped_with(log: &EventLog<u32, String, i64>, status: NodeStatus) -> bool {
    log.snapshot().iter().any(|event| {
        matches!(event, SearchEvent::NodeStatusSwitched { status: s, .. } if *s == status)
    })
}

#[test]
fn timed_out_node_is_pruned_without_fallback() {
    init_logs();
    let log: EventLog<u32, String, i64> = EventLog::new();
    let mut search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 2 }),
        Arc::new(stalling_on_one()),
        SearchConfig::default(),
    );
    search
        .set_node_evaluation_timeout(Duration::from_millis(40), None)
        .unwrap();
    search.add_listener(log.clone());

    // The only path to the goal passes through the timed-out node, so the
    // search dries up without a solution.
    assert_eq!(search.next_solution().unwrap(), None);
    assert!(dropped_with(&log, NodeStatus::TimedOut));
    assert_eq!(search.expanded_count(), 1);
}

#[test]
fn fallback_label_keeps_a_timed_out_node_alive() {
    init_logs();
    let mut search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 2 }),
        Arc::new(stalling_on_one()),
        SearchConfig::default(),
    );
    search
        .set_node_evaluation_timeout(Duration::from_millis(40), Some(Arc::new(DepthEvaluator)))
        .unwrap();

    let solution = search.next_solution().unwrap().expect("solution");
    assert_eq!(solution.path.states, vec![0, 1, 2]);

    let annotations = search.annotations_of(&1).expect("annotations");
    assert!(annotations.contains_key("f_error"));
    assert!(annotations.contains_key("f_time"));
}

#[test]
fn failing_evaluation_prunes_the_node() {
    init_logs();
    let log: EventLog<u32, String, i64> = EventLog::new();
    let evaluator = FnEvaluator(|path: &SearchPath<u32, String>| {
        if path.leaf() == Some(&1) {
            Err(EvaluationError::Failed {
                detail: "synthetic failure".to_string(),
            })
        } else {
            Ok(depth(path))
        }
    });
    let mut search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 2 }),
        Arc::new(evaluator),
        SearchConfig::default(),
    );
    search.add_listener(log.clone());

    assert_eq!(search.next_solution().unwrap(), None);
    assert!(dropped_with(&log, NodeStatus::Failed));
}

#[test]
fn no_value_prunes_silently() {
    init_logs();
    let log: EventLog<u32, String, i64> = EventLog::new();
    let evaluator = FnEvaluator(|path: &SearchPath<u32, String>| {
        if path.leaf() == Some(&1) {
            Err(EvaluationError::NoValue)
        } else {
            Ok(depth(path))
        }
    });
    let mut search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 2 }),
        Arc::new(evaluator),
        SearchConfig::default(),
    );
    search.add_listener(log.clone());

    assert_eq!(search.next_solution().unwrap(), None);
    assert!(dropped_with(&log, NodeStatus::Pruned));
    // The pruned node never reached OPEN.
    assert!(search.label_of(&1).is_none());
}
