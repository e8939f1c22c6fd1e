//! Progress reporting for merge runs.
//!
//! This module provides [`ProgressCallback`] for observing a run from worker
//! threads, [`RunProgress`] for polled snapshots, and the counters workers
//! share while a run is in flight.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use exrmerge::{ExrCodec, InputFileSpec, MergeJob, MergeOptions, RunState};
//!
//! let options = MergeOptions::new().with_progress(Arc::new(|run: &RunState| {
//!     let progress = run.progress();
//!     println!("{}/{}", progress.done, progress.max);
//! }));
//!
//! let files = vec![InputFileSpec::new("beauty.0001.exr", ["R", "G", "B"])];
//! let run = MergeJob::new(files, "out.####.exr", options).start(Arc::new(ExrCodec::new()));
//! let report = run.release();
//! assert!(report.is_full_success());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::run::RunState;

/// A polled snapshot of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    /// Every worker has exited.
    pub complete: bool,
    /// Units of work finished so far.
    pub done: usize,
    /// Total units of work, fixed when the run was created.
    pub max: usize,
}

impl RunProgress {
    /// Completion percentage (0.0 – 100.0). An empty run reports 100.
    pub fn percentage(&self) -> f32 {
        if self.max == 0 {
            return 100.0;
        }
        (self.done as f32 / self.max as f32) * 100.0
    }
}

/// Trait for receiving progress notifications during a run.
///
/// Implementations must be [`Send`] and [`Sync`]: callbacks are invoked
/// concurrently from every worker thread with no ordering between calls.
/// Each worker notifies once per frame group it claims and once more when it
/// exits, so the last notification of a run may already observe completion.
///
/// Progress callbacks are **infallible**, they observe but cannot halt the
/// run. A panic inside a callback is caught and recorded in the run's error
/// log as [`MergeError::CallbackPanic`](crate::MergeError::CallbackPanic);
/// the worker keeps claiming frames.
pub trait ProgressCallback: Send + Sync {
    /// Called from a worker thread after each unit of scheduling work.
    fn on_progress(&self, run: &RunState);
}

impl<F> ProgressCallback for F
where
    F: Fn(&RunState) + Send + Sync,
{
    fn on_progress(&self, run: &RunState) {
        self(run)
    }
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _run: &RunState) {}
}

/// Lock-free counters shared by the workers of one run.
///
/// `done` is advanced with relaxed ordering; it is display data. The
/// finished-worker count uses release/acquire so a poller that observes
/// completion also observes every worker's final writes.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    done: AtomicUsize,
    max: usize,
    workers_finished: AtomicUsize,
    workers: usize,
}

impl ProgressTracker {
    pub(crate) fn new(max: usize, workers: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            max,
            workers_finished: AtomicUsize::new(0),
            workers,
        }
    }

    /// Record one finished unit.
    pub(crate) fn advance(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a worker has exited its claim loop.
    pub(crate) fn worker_finished(&self) {
        self.workers_finished.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.workers_finished.load(Ordering::Acquire) == self.workers
    }

    pub(crate) fn snapshot(&self) -> RunProgress {
        RunProgress {
            complete: self.is_complete(),
            done: self.done.load(Ordering::Relaxed),
            max: self.max,
        }
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers
    }
}
