//! Grouping input files into frames.
//!
//! Every submitted file is bucketed by the frame number in its name. Files
//! that share a number form one [`FrameGroup`] regardless of which sequence
//! they came from, and keep their submission order inside the group since
//! later files win channel-name conflicts during the merge.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::frame::{FrameNumber, frame_number_of_path};

/// One submitted file and the channels to take from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFileSpec {
    /// Source image path.
    pub path: PathBuf,
    /// Requested channel names. Channels not listed are ignored.
    pub channels: BTreeSet<String>,
}

impl InputFileSpec {
    /// Create a spec requesting `channels` from `path`.
    pub fn new<P, I, S>(path: P, channels: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if channel `name` was requested.
    pub fn uses_channel(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    /// The frame this file contributes to.
    pub fn frame(&self) -> FrameNumber {
        frame_number_of_path(&self.path)
    }
}

/// All files contributing to one output frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGroup {
    /// Frame number shared by every file in the group.
    pub frame: FrameNumber,
    /// Files in submission order.
    pub files: Vec<InputFileSpec>,
}

impl FrameGroup {
    /// Paths of the group's files in merge order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|file| file.path.as_path())
    }
}

/// Bucket `files` into frame groups.
///
/// Groups are returned in ascending frame order with the unnumbered group,
/// if any, last. Files inside a group keep their submission order.
///
/// # Example
///
/// ```
/// use exrmerge::{FrameNumber, InputFileSpec, group_by_frame};
///
/// let groups = group_by_frame(vec![
///     InputFileSpec::new("a.0001.exr", ["R"]),
///     InputFileSpec::new("c.0002.exr", ["Z"]),
///     InputFileSpec::new("b.0001.exr", ["G"]),
/// ]);
///
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].frame, FrameNumber::Numbered(1));
/// assert_eq!(groups[0].files.len(), 2);
/// ```
pub fn group_by_frame<I>(files: I) -> Vec<FrameGroup>
where
    I: IntoIterator<Item = InputFileSpec>,
{
    let mut buckets: BTreeMap<FrameNumber, Vec<InputFileSpec>> = BTreeMap::new();
    for file in files {
        buckets.entry(file.frame()).or_default().push(file);
    }

    buckets
        .into_iter()
        .map(|(frame, files)| FrameGroup { frame, files })
        .collect()
}
