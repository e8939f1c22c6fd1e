//! Error types for the `exrmerge` crate.
//!
//! This module defines [`MergeError`], the error type recorded for every
//! failed frame of a merge run, and [`CodecError`], the message a
//! [`Codec`](crate::Codec) implementation reports when a file cannot be
//! read or written. Errors carry the offending file path or frame so a
//! caller can tell which outputs are missing from the message alone.

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::FrameNumber;

/// A failure reported by a [`Codec`](crate::Codec) implementation.
///
/// The merger wraps it into the matching [`MergeError`] variant together
/// with the path that was being processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    /// Create a codec error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The error type for all `exrmerge` operations.
///
/// During a run every variant is scoped to a single frame group: it is
/// formatted into the run's error log and never aborts sibling frames.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum MergeError {
    /// The file's format version preamble could not be parsed.
    #[error("Failed to parse image version of {path}: {reason}")]
    VersionParse {
        /// Source file being decoded.
        path: PathBuf,
        /// Reason reported by the codec.
        reason: String,
    },

    /// The file's header (channel table) could not be parsed.
    #[error("Failed to parse image header of {path}: {reason}")]
    HeaderParse {
        /// Source file being decoded.
        path: PathBuf,
        /// Reason reported by the codec.
        reason: String,
    },

    /// The file's pixel data could not be loaded.
    #[error("Failed to load image data of {path}: {reason}")]
    ImageLoad {
        /// Source file being decoded.
        path: PathBuf,
        /// Reason reported by the codec.
        reason: String,
    },

    /// None of the frame's files supplied a requested channel.
    #[error("Frame {frame} has no channels")]
    NoChannels {
        /// The frame that produced no output.
        frame: FrameNumber,
    },

    /// The merged composite could not be written.
    #[error("Failed to save frame {frame} to {path}: {reason}")]
    ImageSave {
        /// Output path computed from the template.
        path: PathBuf,
        /// The frame being written.
        frame: FrameNumber,
        /// Reason reported by the codec.
        reason: String,
    },

    /// A worker panicked while processing a frame.
    #[error("Worker panicked while processing frame {frame}: {reason}")]
    WorkerPanic {
        /// The frame being processed.
        frame: FrameNumber,
        /// Panic payload, if it was a string.
        reason: String,
    },

    /// The progress callback panicked. The run continues.
    #[error("Progress callback panicked: {reason}")]
    CallbackPanic {
        /// Panic payload, if it was a string.
        reason: String,
    },

    /// A worker thread ended without finishing its claim loop.
    #[error("Merge worker exited abnormally: {reason}")]
    WorkerExit {
        /// Panic payload, if it was a string.
        reason: String,
    },

    /// A merge manifest or input argument was malformed.
    #[error("Invalid merge request: {0}")]
    InvalidManifest(String),

    /// An I/O error occurred while reading request files.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MergeError {
    fn from(error: std::io::Error) -> Self {
        MergeError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(error: serde_json::Error) -> Self {
        MergeError::InvalidManifest(error.to_string())
    }
}
