//! Scenario tests for the search engine.
//!
//! The library part only carries shared plumbing; all assertions live under
//! `tests/`.

#![forbid(unsafe_code)]

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a process-wide tracing subscriber that respects `RUST_LOG` and
/// writes through the test harness. Safe to call from every test.
pub fn init_logs() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}
