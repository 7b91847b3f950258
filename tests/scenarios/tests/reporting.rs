//! Solution-reporting evaluator scenarios: out-of-band announcements flow
//! through the same delivery protocol, without duplicate reports.

use std::sync::Arc;

use wayfarer_core::config::SearchConfig;
use wayfarer_core::events::SearchEvent;
use wayfarer_harness::evaluators::AnnouncingEvaluator;
use wayfarer_harness::recording::EventLog;
use wayfarer_harness::worlds::chain::ChainWorld;
use wayfarer_search::BestFirstSearch;

use scenario_tests::init_logs;

#[test]
fn announced_solutions_are_delivered_exactly_once() {
    init_logs();
    let log: EventLog<u32, String, i64> = EventLog::new();
    let mut search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 3 }),
        Arc::new(AnnouncingEvaluator::new(3u32)),
        SearchConfig::default(),
    );
    search.add_listener(log.clone());

    let solution = search.next_solution().unwrap().expect("solution");
    assert_eq!(solution.path.states, vec![0, 1, 2, 3]);
    assert_eq!(solution.score, 3);
    assert_eq!(search.next_solution().unwrap(), None);

    let reports = log
        .snapshot()
        .iter()
        .filter(|event| matches!(event, SearchEvent::SolutionFound { .. }))
        .count();
    assert_eq!(reports, 1);
}

#[test]
fn interior_announcements_flow_through_the_pending_queue() {
    init_logs();
    // The evaluator announces the path to state 2, which is not a goal; only
    // the out-of-band channel can deliver it.
    let mut search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 3 }),
        Arc::new(AnnouncingEvaluator::new(2u32)),
        SearchConfig::default(),
    );

    let solution = search.next_solution().unwrap().expect("announced path");
    assert_eq!(solution.path.states, vec![0, 1, 2]);
    assert_eq!(solution.score, 2);
    assert_eq!(search.next_solution().unwrap(), None);
}
