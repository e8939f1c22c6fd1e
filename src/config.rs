//! Merge run configuration.
//!
//! [`MergeOptions`] is a builder that threads the worker count and progress
//! callback into [`MergeJob::new`](crate::MergeJob::new) without polluting
//! its signature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use exrmerge::{MergeOptions, ProgressCallback, RunState};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, run: &RunState) {
//!         let progress = run.progress();
//!         println!("{}/{} done", progress.done, progress.max);
//!     }
//! }
//!
//! let options = MergeOptions::new()
//!     .with_threads(4)
//!     .with_progress(Arc::new(LogProgress));
//! assert_eq!(options.resolved_threads(), 4);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::thread;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Worker threads left free for the submitting thread and I/O when the
/// thread count is chosen automatically.
const RESERVED_THREADS: usize = 2;

/// Configuration for a merge run.
///
/// All fields have sensible defaults: an automatic worker count and no
/// progress callback.
#[derive(Clone)]
pub struct MergeOptions {
    /// Worker threads. `0` picks a count from the available parallelism.
    pub(crate) threads: usize,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    has_progress: bool,
}

impl Debug for MergeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MergeOptions")
            .field("threads", &self.threads)
            .field("has_progress", &self.has_progress)
            .finish()
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeOptions {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            threads: 0,
            progress: Arc::new(NoOpProgress),
            has_progress: false,
        }
    }

    /// Set the number of worker threads. `0` means automatic.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Attach a progress callback.
    ///
    /// The callback is invoked from worker threads once per frame group
    /// claimed and once per worker exit.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self.has_progress = true;
        self
    }

    /// The worker count a run will use.
    ///
    /// An explicit count is used as given. Otherwise two hardware threads
    /// are left free, with a minimum of one worker.
    pub fn resolved_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        let available = thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        available.saturating_sub(RESERVED_THREADS).max(1)
    }
}
