//! The image codec collaborator.
//!
//! The merge engine never touches a bitstream itself. It drives a [`Codec`]
//! through four synchronous calls (version, header, pixel data, save) and
//! works on the codec-neutral types defined here. Decoded resources are
//! released by `Drop` when the worker that owns them finishes a frame.
//!
//! [`ExrCodec`](crate::ExrCodec) is the implementation used for OpenEXR
//! files; tests and benchmarks plug in in-memory codecs.

use std::path::Path;

use crate::error::CodecError;

/// Storage type of one channel's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// 32-bit unsigned integer.
    Uint,
    /// 16-bit IEEE half float.
    Half,
    /// 32-bit IEEE float.
    Float,
}

impl PixelType {
    /// Size of one sample in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PixelType::Half => 2,
            PixelType::Uint | PixelType::Float => 4,
        }
    }
}

/// Parsed file format version and feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatVersion {
    /// Format version number.
    pub number: u8,
    /// Single-part tiled image.
    pub tiled: bool,
    /// Attribute and channel names may exceed 31 bytes.
    pub long_names: bool,
    /// File contains deep (non-image) data.
    pub non_image: bool,
    /// File contains more than one part.
    pub multipart: bool,
}

/// Name and sample type of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel name, e.g. `R` or `N.X`.
    pub name: String,
    /// Sample storage type.
    pub pixel_type: PixelType,
}

impl ChannelInfo {
    /// Create a channel description.
    pub fn new(name: impl Into<String>, pixel_type: PixelType) -> Self {
        Self {
            name: name.into(),
            pixel_type,
        }
    }
}

/// Image dimensions and channel table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Channels in file order.
    pub channels: Vec<ChannelInfo>,
}

impl ImageHeader {
    /// Names of all channels in file order.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|channel| channel.name.clone()).collect()
    }

    /// Number of pixels per channel plane.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Decoded pixel data, one little-endian byte plane per header channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedImage {
    /// Planes indexed like [`ImageHeader::channels`].
    pub planes: Vec<Vec<u8>>,
}

impl DecodedImage {
    /// Borrow the plane for header channel `index`.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(Vec::as_slice)
    }
}

/// One channel of a composite, borrowed from the file that supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedChannel<'a> {
    /// Channel name, borrowed from the source header.
    pub name: &'a str,
    /// Sample type of the winning source.
    pub pixel_type: PixelType,
    /// Position of the source file within its frame group.
    pub source: usize,
    /// Sample bytes, borrowed from the source image.
    pub data: &'a [u8],
}

/// A merged image ready to be saved.
///
/// Dimensions come from the frame group's first file; channels are sorted by
/// name and may each reference a different source file.
#[derive(Debug, Clone, Copy)]
pub struct Composite<'a> {
    /// Header supplying the output dimensions.
    pub header: &'a ImageHeader,
    /// Name-sorted merged channels.
    pub channels: &'a [MergedChannel<'a>],
}

/// Synchronous image codec used by merge workers.
///
/// Implementations are shared by every worker thread of a run and must be
/// [`Send`] and [`Sync`]. All methods block on file I/O.
pub trait Codec: Send + Sync {
    /// Read the format version preamble of `path`.
    fn parse_version(&self, path: &Path) -> Result<FormatVersion, CodecError>;

    /// Read the header (dimensions and channel table) of `path`.
    fn parse_header(&self, path: &Path, version: &FormatVersion)
    -> Result<ImageHeader, CodecError>;

    /// Load every channel plane described by `header`.
    fn load_image(&self, path: &Path, header: &ImageHeader) -> Result<DecodedImage, CodecError>;

    /// Write `composite` to `path`.
    fn save_image(&self, path: &Path, composite: &Composite<'_>) -> Result<(), CodecError>;
}
