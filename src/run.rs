//! Running a merge across a fixed pool of worker threads.
//!
//! A [`MergeJob`] groups the submitted files into frames up front, on the
//! calling thread. [`MergeJob::start`] then launches the workers and returns
//! a [`MergeRun`] handle. Workers claim frame groups through one shared
//! atomic cursor over the immutable group list, so no lock is taken on the
//! hot path; only the error log is behind a mutex.
//!
//! A run cannot be cancelled. The caller polls until it is complete, reads
//! the error log, and releases the handle, which joins every worker.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use exrmerge::{ExrCodec, InputFileSpec, MergeJob, MergeOptions};
//!
//! let files = vec![
//!     InputFileSpec::new("beauty.0001.exr", ["R", "G", "B", "A"]),
//!     InputFileSpec::new("depth.0001.exr", ["Z"]),
//! ];
//! let run = MergeJob::new(files, "merged.####.exr", MergeOptions::new())
//!     .start(Arc::new(ExrCodec::new()));
//!
//! while !run.poll().complete {
//!     std::thread::sleep(Duration::from_millis(50));
//! }
//!
//! let report = run.release();
//! for error in &report.errors {
//!     eprintln!("{error}");
//! }
//! ```

use std::any::Any;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::codec::Codec;
use crate::config::MergeOptions;
use crate::error::MergeError;
use crate::merge::merge_frame_with;
use crate::progress::{ProgressCallback, ProgressTracker, RunProgress};
use crate::sequence::{FrameGroup, InputFileSpec, group_by_frame};

/// A grouped batch that has not started yet.
#[derive(Debug)]
pub struct MergeJob {
    groups: Vec<FrameGroup>,
    template: String,
    file_count: usize,
    options: MergeOptions,
}

impl MergeJob {
    /// Group `files` by frame number and prepare a run writing to
    /// `template`.
    ///
    /// The rightmost `#` run of the template is replaced by each frame's
    /// zero-padded number; see [`output_path`](crate::output_path).
    pub fn new<I>(files: I, template: impl Into<String>, options: MergeOptions) -> Self
    where
        I: IntoIterator<Item = InputFileSpec>,
    {
        let files: Vec<InputFileSpec> = files.into_iter().collect();
        let file_count = files.len();
        let groups = group_by_frame(files);

        Self {
            groups,
            template: template.into(),
            file_count,
            options,
        }
    }

    /// Frame groups in processing order.
    pub fn frame_groups(&self) -> &[FrameGroup] {
        &self.groups
    }

    /// Number of submitted files.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Total progress units: one per file plus one per frame group.
    pub fn total_units(&self) -> usize {
        self.file_count + self.groups.len()
    }

    /// Launch the worker threads.
    pub fn start(self, codec: Arc<dyn Codec>) -> MergeRun {
        let threads = self.options.resolved_threads();
        let state = Arc::new(RunState {
            progress: ProgressTracker::new(self.total_units(), threads),
            groups: self.groups,
            template: self.template,
            cursor: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
            codec,
            callback: self.options.progress,
        });

        log::info!(
            "Starting merge of {} files in {} frame groups on {} threads",
            self.file_count,
            state.groups.len(),
            threads
        );

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let worker_state = Arc::clone(&state);
            let spawned = thread::Builder::new()
                .name(format!("exrmerge-worker-{index}"))
                .spawn(move || worker_state.run_worker());

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => {
                    state.record_error(MergeError::Io(format!(
                        "failed to spawn worker thread {index}: {error}"
                    )));
                    state.progress.worker_finished();
                }
            }
        }

        MergeRun { state, workers }
    }
}

/// State shared by the workers of one run.
///
/// Progress callbacks receive a reference to it and may poll it exactly
/// like the owning [`MergeRun`].
pub struct RunState {
    groups: Vec<FrameGroup>,
    template: String,
    cursor: AtomicUsize,
    progress: ProgressTracker,
    errors: Mutex<Vec<String>>,
    codec: Arc<dyn Codec>,
    callback: Arc<dyn ProgressCallback>,
}

impl Debug for RunState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RunState")
            .field("frame_groups", &self.groups.len())
            .field("template", &self.template)
            .field("progress", &self.progress.snapshot())
            .field("error_count", &self.error_count())
            .finish()
    }
}

impl RunState {
    /// Snapshot of completion and progress counters. Never blocks.
    pub fn progress(&self) -> RunProgress {
        self.progress.snapshot()
    }

    /// Returns `true` once every worker has exited.
    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.lock_errors().len()
    }

    /// The error at `index`, in the order errors were recorded.
    pub fn error(&self, index: usize) -> Option<String> {
        self.lock_errors().get(index).cloned()
    }

    /// All errors recorded so far.
    pub fn errors(&self) -> Vec<String> {
        self.lock_errors().clone()
    }

    /// Frame groups in processing order.
    pub fn frame_groups(&self) -> &[FrameGroup] {
        &self.groups
    }

    /// Output path template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of worker threads the run was started with.
    pub fn threads(&self) -> usize {
        self.progress.workers()
    }

    fn lock_errors(&self) -> MutexGuard<'_, Vec<String>> {
        // A poisoned log still holds every message pushed before the panic.
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_error(&self, error: MergeError) {
        log::warn!("{error}");
        self.lock_errors().push(error.to_string());
    }

    fn claim_next(&self) -> Option<&FrameGroup> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.groups.get(index)
    }

    fn run_worker(&self) {
        while let Some(group) = self.claim_next() {
            log::debug!("Processing frame {} ({} files)", group.frame, group.files.len());
            self.process(group);
            self.notify();
        }

        self.progress.worker_finished();
        self.notify();
    }

    fn process(&self, group: &FrameGroup) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            merge_frame_with(self.codec.as_ref(), group, &self.template, &mut || {
                self.progress.advance()
            })
        }));
        self.progress.advance();

        match result {
            Ok(Ok(_path)) => {}
            Ok(Err(error)) => self.record_error(error),
            Err(payload) => self.record_error(MergeError::WorkerPanic {
                frame: group.frame,
                reason: panic_reason(payload.as_ref()),
            }),
        }
    }

    /// Invoke the progress callback. A panicking callback is logged as an
    /// error and the worker carries on.
    fn notify(&self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.callback.on_progress(self)));
        if let Err(payload) = result {
            self.record_error(MergeError::CallbackPanic {
                reason: panic_reason(payload.as_ref()),
            });
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Handle to an in-flight run.
///
/// Dropping the handle joins every worker, exactly like
/// [`release`](MergeRun::release) but without returning a report.
#[derive(Debug)]
pub struct MergeRun {
    state: Arc<RunState>,
    workers: Vec<JoinHandle<()>>,
}

impl MergeRun {
    /// Snapshot of completion and progress counters. Never blocks.
    pub fn poll(&self) -> RunProgress {
        self.state.progress()
    }

    /// Returns `true` once every worker has exited.
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.state.error_count()
    }

    /// The error at `index`, or `None` if out of range.
    pub fn error(&self, index: usize) -> Option<String> {
        self.state.error(index)
    }

    /// Shared run state, as seen by progress callbacks.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Wait for every worker to exit and return the final report.
    pub fn release(mut self) -> RunReport {
        self.join_workers();

        let progress = self.state.progress();
        let report = RunReport {
            frame_groups: self.state.groups.len(),
            threads: self.state.threads(),
            done: progress.done,
            max: progress.max,
            errors: self.state.errors(),
        };

        log::info!(
            "Merge finished: {} frame groups, {} errors",
            report.frame_groups,
            report.errors.len()
        );
        report
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            if let Err(payload) = handle.join() {
                self.state.record_error(MergeError::WorkerExit {
                    reason: panic_reason(payload.as_ref()),
                });
            }
        }
    }
}

impl Drop for MergeRun {
    fn drop(&mut self) {
        self.join_workers();
    }
}

/// Final outcome of a released run.
///
/// A run with errors is a partial success: frames not named in
/// [`errors`](RunReport::errors) were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Number of frame groups in the run.
    pub frame_groups: usize,
    /// Number of worker threads used.
    pub threads: usize,
    /// Progress units finished.
    pub done: usize,
    /// Total progress units.
    pub max: usize,
    /// Error messages in the order they were recorded.
    pub errors: Vec<String>,
}

impl RunReport {
    /// Returns `true` if no error was recorded.
    pub fn is_full_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if at least one error was recorded.
    pub fn is_partial_success(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of recorded errors.
    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }
}
