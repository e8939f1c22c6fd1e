//! # exrmerge
//!
//! Merge channels from multi-file image sequences into per-frame composites.
//!
//! Renderers often split one frame across several sibling files (beauty,
//! depth, cryptomatte, ...). `exrmerge` groups the files of a sequence by
//! the frame number in their names, takes the requested channels from each
//! file of a frame, and writes one composite image per frame. It can just as
//! well extract a subset of channels from a single sequence.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use exrmerge::{ExrCodec, InputFileSpec, MergeJob, MergeOptions};
//!
//! let files = vec![
//!     InputFileSpec::new("beauty.0001.exr", ["R", "G", "B", "A"]),
//!     InputFileSpec::new("beauty.0002.exr", ["R", "G", "B", "A"]),
//!     InputFileSpec::new("aux.0001.exr", ["Z"]),
//!     InputFileSpec::new("aux.0002.exr", ["Z"]),
//! ];
//!
//! let job = MergeJob::new(files, "merged.####.exr", MergeOptions::new().with_threads(2));
//! let run = job.start(Arc::new(ExrCodec::new()));
//! let report = run.release();
//!
//! if report.is_partial_success() {
//!     for error in &report.errors {
//!         eprintln!("{error}");
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - **Frame grouping** — the last digit run of each input path is its frame;
//!   files sharing a frame are merged together
//! - **Last-write-wins merge** — when several files supply a channel, the
//!   one submitted last is used
//! - **Zero-copy composites** — merged channels borrow the decoded planes of
//!   their source files
//! - **Worker pool** — a fixed set of threads claims frames through one
//!   atomic cursor
//! - **Pollable runs** — non-blocking progress, an error log, and a report
//!   that distinguishes full from partial success
//! - **Channel categories** — select passes such as `@color` or `@depth`
//!   instead of listing channels
//! - **Pluggable codec** — [`ExrCodec`] for OpenEXR, or any [`Codec`]

pub mod category;
pub mod codec;
pub mod config;
pub mod error;
pub mod exr_codec;
pub mod frame;
pub mod merge;
pub mod progress;
pub mod request;
pub mod run;
pub mod sequence;

pub use category::{ChannelCategory, classify, group_channels};
pub use codec::{
    ChannelInfo, Codec, Composite, DecodedImage, FormatVersion, ImageHeader, MergedChannel,
    PixelType,
};
pub use config::MergeOptions;
pub use error::{CodecError, MergeError};
pub use exr_codec::ExrCodec;
pub use frame::{FrameNumber, extract_frame_number, frame_number_of_path, output_path};
pub use merge::{MergedChannelSet, merge_frame};
pub use progress::{ProgressCallback, RunProgress};
pub use request::{ChannelSelector, InputArg, MergeManifest, load_manifest, parse_input_arg};
pub use run::{MergeJob, MergeRun, RunReport, RunState};
pub use sequence::{FrameGroup, InputFileSpec, group_by_frame};
