//! OpenEXR codec backed by the pure-Rust [`exr`] crate.
//!
//! Only the first flat (non-deep) part of a multi-part file is read, and the
//! loaded pixels are checked against that part's header. Deep data is
//! rejected.
//! Samples cross the [`Codec`] boundary as little-endian byte planes and are
//! converted back to typed samples when a composite is written, so a merged
//! channel keeps the exact bits of the file it came from.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::codec::{
    ChannelInfo, Codec, Composite, DecodedImage, FormatVersion, ImageHeader, PixelType,
};
use crate::error::CodecError;

const MAGIC: [u8; 4] = [0x76, 0x2f, 0x31, 0x01];

const FLAG_TILED: u32 = 0x200;
const FLAG_LONG_NAMES: u32 = 0x400;
const FLAG_NON_IMAGE: u32 = 0x800;
const FLAG_MULTIPART: u32 = 0x1000;

/// [`Codec`] implementation for OpenEXR files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExrCodec {
    pedantic: bool,
}

impl ExrCodec {
    /// Create a codec that tolerates minor header inconsistencies.
    pub fn new() -> Self {
        Self { pedantic: false }
    }

    /// Reject files whose headers break any OpenEXR format rule.
    #[must_use]
    pub fn pedantic(mut self, pedantic: bool) -> Self {
        self.pedantic = pedantic;
        self
    }
}

/// Decode the 8-byte OpenEXR preamble: magic number, then a little-endian
/// word holding the version in its low byte and feature flags above it.
pub fn parse_preamble(bytes: &[u8; 8]) -> Result<FormatVersion, CodecError> {
    if bytes[..4] != MAGIC {
        return Err(CodecError::new("not an OpenEXR file (bad magic number)"));
    }

    let field = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let version = FormatVersion {
        number: (field & 0xff) as u8,
        tiled: field & FLAG_TILED != 0,
        long_names: field & FLAG_LONG_NAMES != 0,
        non_image: field & FLAG_NON_IMAGE != 0,
        multipart: field & FLAG_MULTIPART != 0,
    };

    if version.number != 2 {
        return Err(CodecError::new(format!(
            "unsupported OpenEXR version {}",
            version.number
        )));
    }
    Ok(version)
}

fn pixel_type_of(sample_type: exr::meta::attribute::SampleType) -> PixelType {
    use exr::meta::attribute::SampleType;

    match sample_type {
        SampleType::U32 => PixelType::Uint,
        SampleType::F16 => PixelType::Half,
        SampleType::F32 => PixelType::Float,
    }
}

fn samples_to_bytes(samples: &exr::image::FlatSamples) -> Vec<u8> {
    use exr::image::FlatSamples;

    match samples {
        FlatSamples::F16(values) => values
            .iter()
            .flat_map(|value| value.to_bits().to_le_bytes())
            .collect(),
        FlatSamples::F32(values) => values.iter().flat_map(|value| value.to_le_bytes()).collect(),
        FlatSamples::U32(values) => values.iter().flat_map(|value| value.to_le_bytes()).collect(),
    }
}

fn bytes_to_samples(pixel_type: PixelType, data: &[u8]) -> exr::image::FlatSamples {
    use exr::image::FlatSamples;
    use exr::prelude::f16;

    match pixel_type {
        PixelType::Half => FlatSamples::F16(
            data.chunks_exact(2)
                .map(|bytes| f16::from_bits(u16::from_le_bytes([bytes[0], bytes[1]])))
                .collect(),
        ),
        PixelType::Float => FlatSamples::F32(
            data.chunks_exact(4)
                .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                .collect(),
        ),
        PixelType::Uint => FlatSamples::U32(
            data.chunks_exact(4)
                .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                .collect(),
        ),
    }
}

impl Codec for ExrCodec {
    fn parse_version(&self, path: &Path) -> Result<FormatVersion, CodecError> {
        let mut preamble = [0u8; 8];
        File::open(path)
            .and_then(|mut file| file.read_exact(&mut preamble))
            .map_err(|error| CodecError::new(error.to_string()))?;
        parse_preamble(&preamble)
    }

    fn parse_header(
        &self,
        path: &Path,
        version: &FormatVersion,
    ) -> Result<ImageHeader, CodecError> {
        if version.non_image {
            return Err(CodecError::new("deep data is not supported"));
        }

        let meta = exr::meta::MetaData::read_from_file(path, self.pedantic)
            .map_err(|error| CodecError::new(error.to_string()))?;
        let header = meta
            .headers
            .iter()
            .find(|header| !header.deep)
            .ok_or_else(|| CodecError::new("file contains no flat image part"))?;

        let channels = header
            .channels
            .list
            .iter()
            .map(|channel| {
                ChannelInfo::new(channel.name.to_string(), pixel_type_of(channel.sample_type))
            })
            .collect();

        Ok(ImageHeader {
            width: header.layer_size.0,
            height: header.layer_size.1,
            channels,
        })
    }

    fn load_image(&self, path: &Path, header: &ImageHeader) -> Result<DecodedImage, CodecError> {
        use exr::prelude::*;

        let image = read()
            .no_deep_data()
            .largest_resolution_level()
            .all_channels()
            .first_valid_layer()
            .all_attributes()
            .from_file(path)
            .map_err(|error| CodecError::new(error.to_string()))?;

        let layer = &image.layer_data;
        if (layer.size.0, layer.size.1) != (header.width, header.height) {
            return Err(CodecError::new(format!(
                "loaded part is {}x{}, header describes {}x{}",
                layer.size.0, layer.size.1, header.width, header.height
            )));
        }

        let loaded = &layer.channel_data.list;
        let mut planes = Vec::with_capacity(header.channels.len());
        for info in &header.channels {
            let channel = loaded
                .iter()
                .find(|channel| channel.name.to_string() == info.name)
                .ok_or_else(|| {
                    CodecError::new(format!("channel {} has no pixel data", info.name))
                })?;
            let plane = samples_to_bytes(&channel.sample_data);
            if plane.len() != header.pixel_count() * info.pixel_type.bytes_per_sample() {
                return Err(CodecError::new(format!(
                    "channel {} does not match its header type",
                    info.name
                )));
            }
            planes.push(plane);
        }

        Ok(DecodedImage { planes })
    }

    fn save_image(&self, path: &Path, composite: &Composite<'_>) -> Result<(), CodecError> {
        use exr::prelude::*;

        let pixels = composite.header.pixel_count();
        let mut channels = Vec::with_capacity(composite.channels.len());
        for channel in composite.channels {
            let expected = pixels * channel.pixel_type.bytes_per_sample();
            if channel.data.len() != expected {
                return Err(CodecError::new(format!(
                    "channel {} has {} bytes, expected {} for {}x{}",
                    channel.name,
                    channel.data.len(),
                    expected,
                    composite.header.width,
                    composite.header.height
                )));
            }
            channels.push(AnyChannel::new(
                channel.name,
                bytes_to_samples(channel.pixel_type, channel.data),
            ));
        }

        let layer = Layer::new(
            (composite.header.width, composite.header.height),
            LayerAttributes::default(),
            Encoding::FAST_LOSSLESS,
            AnyChannels::sort(channels.into()),
        );

        Image::from_layer(layer)
            .write()
            .to_file(path)
            .map_err(|error| CodecError::new(error.to_string()))
    }
}
