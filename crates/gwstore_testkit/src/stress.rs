//! Concurrent stress helpers.
//!
//! These helpers race many writers against one store to exercise the
//! backend's transaction isolation.

use gwstore_core::{Context, ObjectStore, StoreError, StoreResult};
use std::sync::Barrier;
use std::thread;

/// Outcome counts of a race.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceOutcome {
    /// Writers whose call succeeded.
    pub succeeded: usize,
    /// Writers rejected with a constraint error.
    pub constraint_failures: usize,
    /// Writers that failed any other way.
    pub other_failures: usize,
}

impl RaceOutcome {
    fn record(&mut self, result: StoreResult<()>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(StoreError::Constraint(_)) => self.constraint_failures += 1,
            Err(_) => self.other_failures += 1,
        }
    }
}

/// Runs `writers` threads that start together and each call `op` once with
/// its index.
pub fn race<F>(store: &ObjectStore, writers: usize, op: F) -> RaceOutcome
where
    F: Fn(&ObjectStore, &Context, usize) -> StoreResult<()> + Sync,
{
    let barrier = Barrier::new(writers);
    let ctx = Context::background();
    let results: Vec<StoreResult<()>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let (barrier, ctx, op) = (&barrier, &ctx, &op);
                scope.spawn(move || {
                    barrier.wait();
                    op(store, ctx, i)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Writer thread panicked"))
            .collect()
    });

    let mut outcome = RaceOutcome::default();
    for result in results {
        outcome.record(result);
    }
    outcome
}
