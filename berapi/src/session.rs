//! Glue between a [`Tracker`] and a test runner: the tracker is cleared
//! before each test and its contents are printed when the test panics.

use crate::tracker::Tracker;
use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TestSession {
    tracker: Arc<Tracker>,
}

impl TestSession {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Forgets the exchanges of the previous test.
    pub fn before_test(&self) {
        self.tracker.clear();
    }

    /// Text summary of the tracked exchanges, or `None` when nothing was tracked.
    pub fn failure_report(&self) -> Option<String> {
        let count = self.tracker.len();
        if count == 0 {
            return None;
        }

        Some(format!(
            "API Debug ({} request{})\n{}",
            count,
            if count == 1 { "" } else { "s" },
            self.tracker.to_text()
        ))
    }

    /// Runs `test` on a cleared tracker. If it panics, the report is written
    /// to stderr and the panic is resumed so the runner still sees the failure.
    pub fn run<T, F: FnOnce() -> T>(&self, test: F) -> T {
        self.before_test();

        match panic::catch_unwind(AssertUnwindSafe(test)) {
            Ok(value) => value,
            Err(payload) => {
                if let Some(report) = self.failure_report() {
                    eprintln!("{}", report);
                }
                debug!(exchanges = self.tracker.len(), "test failed");
                panic::resume_unwind(payload)
            }
        }
    }
}

/// Shorthand for `TestSession::new(tracker).run(test)`.
pub fn run_tracked<T, F: FnOnce() -> T>(tracker: Arc<Tracker>, test: F) -> T {
    TestSession::new(tracker).run(test)
}

/// Drives `future` to completion on a fresh current-thread runtime.
///
/// Panics if the runtime cannot be created. Must not be called from inside
/// another runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(future),
        Err(e) => panic!("failed to start the test runtime: {}", e),
    }
}
