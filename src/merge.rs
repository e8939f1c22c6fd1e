//! Merging the channels of one frame group.
//!
//! Each file of the group is decoded in order and its requested channels
//! are folded into a [`MergedChannelSet`], a name-sorted table of borrowed
//! planes. When two files supply the same channel name the later file wins,
//! including its pixel type. The finished table is handed to the codec as a
//! [`Composite`] without copying any pixel data.

use std::path::{Path, PathBuf};

use crate::codec::{Codec, Composite, DecodedImage, ImageHeader, MergedChannel};
use crate::error::MergeError;
use crate::frame::output_path;
use crate::sequence::{FrameGroup, InputFileSpec};

/// Name-sorted, name-unique table of merged channels.
#[derive(Debug, Clone, Default)]
pub struct MergedChannelSet<'a> {
    channels: Vec<MergedChannel<'a>>,
}

impl<'a> MergedChannelSet<'a> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Insert `channel`, replacing the type, source, and data of an existing
    /// entry with the same name.
    pub fn insert(&mut self, channel: MergedChannel<'a>) {
        match self
            .channels
            .binary_search_by(|existing| existing.name.cmp(channel.name))
        {
            Ok(index) => self.channels[index] = channel,
            Err(index) => self.channels.insert(index, channel),
        }
    }

    /// Look up a merged channel by name.
    pub fn get(&self, name: &str) -> Option<&MergedChannel<'a>> {
        self.channels
            .binary_search_by(|existing| existing.name.cmp(name))
            .ok()
            .map(|index| &self.channels[index])
    }

    /// Channel names in sorted order.
    pub fn names(&self) -> Vec<&'a str> {
        self.channels.iter().map(|channel| channel.name).collect()
    }

    /// Number of merged channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no channel was merged.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The merged channels in sorted order.
    pub fn as_slice(&self) -> &[MergedChannel<'a>] {
        &self.channels
    }
}

/// Header and pixel data of one successfully decoded source file.
#[derive(Debug)]
pub struct DecodedFile<'g> {
    /// The request this file was decoded for.
    pub spec: &'g InputFileSpec,
    /// Parsed header.
    pub header: ImageHeader,
    /// Loaded planes, indexed like `header.channels`.
    pub image: DecodedImage,
}

/// Fold the requested channels of `files` into a merged set.
///
/// Files are scanned in order, so a later file replaces any channel of the
/// same name supplied earlier.
pub fn merge_channels<'a>(files: &'a [DecodedFile<'_>]) -> MergedChannelSet<'a> {
    let mut merged = MergedChannelSet::new();

    for (source, file) in files.iter().enumerate() {
        for (index, channel) in file.header.channels.iter().enumerate() {
            if !file.spec.uses_channel(&channel.name) {
                continue;
            }
            let Some(data) = file.image.plane(index) else {
                continue;
            };
            merged.insert(MergedChannel {
                name: &channel.name,
                pixel_type: channel.pixel_type,
                source,
                data,
            });
        }
    }

    merged
}

/// Decode one source file: version, header, then pixel data.
pub fn decode_file<'g>(
    codec: &dyn Codec,
    spec: &'g InputFileSpec,
) -> Result<DecodedFile<'g>, MergeError> {
    let path = spec.path.as_path();

    let version = codec
        .parse_version(path)
        .map_err(|error| MergeError::VersionParse {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

    let header = codec
        .parse_header(path, &version)
        .map_err(|error| MergeError::HeaderParse {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

    let image = codec
        .load_image(path, &header)
        .map_err(|error| MergeError::ImageLoad {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

    if image.planes.len() != header.channels.len() {
        return Err(MergeError::ImageLoad {
            path: path.to_path_buf(),
            reason: format!(
                "decoded {} planes for {} channels",
                image.planes.len(),
                header.channels.len()
            ),
        });
    }

    log::debug!(
        "Decoded {} ({}x{}, {} channels)",
        path.display(),
        header.width,
        header.height,
        header.channels.len()
    );

    Ok(DecodedFile {
        spec,
        header,
        image,
    })
}

/// Merge and save one frame group, returning the path that was written.
///
/// The first decode failure aborts the group; files after it are not read.
pub fn merge_frame(
    codec: &dyn Codec,
    group: &FrameGroup,
    template: &str,
) -> Result<PathBuf, MergeError> {
    merge_frame_with(codec, group, template, &mut || {})
}

/// [`merge_frame`] with a hook fired after every decode attempt, successful
/// or not.
pub(crate) fn merge_frame_with(
    codec: &dyn Codec,
    group: &FrameGroup,
    template: &str,
    on_decode_attempt: &mut dyn FnMut(),
) -> Result<PathBuf, MergeError> {
    let mut decoded = Vec::with_capacity(group.files.len());
    for spec in &group.files {
        let result = decode_file(codec, spec);
        on_decode_attempt();
        decoded.push(result?);
    }

    let merged = merge_channels(&decoded);
    let Some(first) = decoded.first() else {
        return Err(MergeError::NoChannels { frame: group.frame });
    };
    if merged.is_empty() {
        return Err(MergeError::NoChannels { frame: group.frame });
    }

    let path = output_path(template, group.frame);
    save_composite(codec, &path, &first.header, &merged).map_err(|reason| {
        MergeError::ImageSave {
            path: path.clone(),
            frame: group.frame,
            reason,
        }
    })?;

    log::debug!(
        "Saved frame {} with {} channels to {}",
        group.frame,
        merged.len(),
        path.display()
    );

    Ok(path)
}

fn save_composite(
    codec: &dyn Codec,
    path: &Path,
    header: &ImageHeader,
    merged: &MergedChannelSet<'_>,
) -> Result<(), String> {
    let composite = Composite {
        header,
        channels: merged.as_slice(),
    };
    codec
        .save_image(path, &composite)
        .map_err(|error| error.to_string())
}
