//! Cancellation scenarios: handles, idempotence, capability forwarding, and
//! cancel-on-drop.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wayfarer_core::config::{ParentDiscarding, SearchConfig};
use wayfarer_core::error::SearchError;
use wayfarer_core::events::SearchEvent;
use wayfarer_harness::evaluators::{CancelProbeEvaluator, DepthEvaluator, SlowEvaluator};
use wayfarer_harness::worlds::chain::ChainWorld;
use wayfarer_harness::worlds::lattice::LatticeWorld;
use wayfarer_search::BestFirstSearch;

use scenario_tests::init_logs;

fn long_chain() -> BestFirstSearch<u32, String, i64> {
    BestFirstSearch::new(
        Arc::new(ChainWorld { length: 10_000 }),
        Arc::new(DepthEvaluator),
        SearchConfig::default(),
    )
}

#[test]
fn cancel_stops_the_next_step() {
    init_logs();
    let mut search = long_chain();
    for _ in 0..4 {
        search.step().unwrap();
    }
    let handle = search.cancel_handle();
    handle.cancel();
    handle.cancel();
    assert!(handle.is_canceled());
    assert!(matches!(search.step(), Err(SearchError::Canceled)));
    assert!(matches!(
        search.step(),
        Err(SearchError::IllegalState { .. })
    ));
}

#[test]
fn cancel_with_workers_in_flight_drains_the_pool() {
    init_logs();
    // Large enough that the run cannot finish before the cancellation lands,
    // slow enough that build jobs are in flight when it does.
    let mut search: BestFirstSearch<(u32, u32), String, i64> = BestFirstSearch::new(
        Arc::new(LatticeWorld {
            width: 40,
            height: 40,
        }),
        Arc::new(SlowEvaluator {
            delay: Duration::from_millis(5),
            inner: DepthEvaluator,
        }),
        SearchConfig {
            parent_discarding: ParentDiscarding::Open,
            num_workers: 3,
        },
    );
    let handle = search.cancel_handle();
    let canceler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        handle.cancel();
        handle.cancel();
    });

    let outcome = loop {
        match search.step() {
            Ok(SearchEvent::Finished) => break Ok(()),
            Ok(_) => {}
            Err(err) => break Err(err),
        }
    };
    canceler.join().unwrap();
    assert_eq!(outcome, Err(SearchError::Canceled));
    assert!(matches!(
        search.step(),
        Err(SearchError::IllegalState { .. })
    ));

    // Builders that were mid-flight when the cancellation landed still hold
    // their job slots until they unwind.
    let deadline = Instant::now() + Duration::from_secs(2);
    while search.active_jobs() > 0 {
        assert!(Instant::now() < deadline, "build jobs did not drain");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn cancellation_is_forwarded_to_a_cancelable_evaluator() {
    init_logs();
    let evaluator = CancelProbeEvaluator::new();
    let probe = evaluator.probe();
    let search: BestFirstSearch<u32, String, i64> = BestFirstSearch::new(
        Arc::new(ChainWorld { length: 100 }),
        Arc::new(evaluator),
        SearchConfig::default(),
    );
    search.cancel();
    assert!(probe.load(Ordering::SeqCst));
}

#[test]
fn dropping_the_engine_cancels_outstanding_handles() {
    init_logs();
    let search = long_chain();
    let handle = search.cancel_handle();
    assert!(!handle.is_canceled());
    drop(search);
    assert!(handle.is_canceled());
}
