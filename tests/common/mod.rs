//! In-memory codec shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use exrmerge::{
    ChannelInfo, Codec, CodecError, Composite, DecodedImage, FormatVersion, ImageHeader,
    PixelType,
};

/// Which codec call should fail for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Version,
    Header,
    Load,
    Panic,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    header: ImageHeader,
    planes: Vec<Vec<u8>>,
}

/// One channel of a saved composite, copied out for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedChannel {
    pub name: String,
    pub pixel_type: PixelType,
    pub source: usize,
    pub data: Vec<u8>,
}

/// A composite captured by [`MemoryCodec::save_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub width: usize,
    pub height: usize,
    pub channels: Vec<SavedChannel>,
}

impl SavedImage {
    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|channel| channel.name.as_str()).collect()
    }

    pub fn channel(&self, name: &str) -> Option<&SavedChannel> {
        self.channels.iter().find(|channel| channel.name == name)
    }
}

/// Codec over a fixed set of in-memory files.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    files: HashMap<PathBuf, MemoryFile>,
    failures: HashMap<PathBuf, Failure>,
    failing_saves: Vec<PathBuf>,
    decode_delay: Option<Duration>,
    decoded: Mutex<Vec<PathBuf>>,
    saved: Mutex<Vec<(PathBuf, SavedImage)>>,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a 2x2 file whose every channel plane is filled with `fill`.
    pub fn with_file(mut self, path: &str, channels: &[(&str, PixelType, u8)]) -> Self {
        let width = 2;
        let height = 2;
        let header = ImageHeader {
            width,
            height,
            channels: channels
                .iter()
                .map(|(name, pixel_type, _)| ChannelInfo::new(*name, *pixel_type))
                .collect(),
        };
        let planes = channels
            .iter()
            .map(|(_, pixel_type, fill)| vec![*fill; width * height * pixel_type.bytes_per_sample()])
            .collect();
        self.files.insert(PathBuf::from(path), MemoryFile { header, planes });
        self
    }

    pub fn with_failure(mut self, path: &str, failure: Failure) -> Self {
        self.failures.insert(PathBuf::from(path), failure);
        self
    }

    pub fn with_failing_save(mut self, path: &str) -> Self {
        self.failing_saves.push(PathBuf::from(path));
        self
    }

    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = Some(delay);
        self
    }

    /// Paths whose pixel data was loaded, in call order.
    pub fn decoded_paths(&self) -> Vec<PathBuf> {
        self.decoded.lock().unwrap().clone()
    }

    /// Every composite saved so far, in call order.
    pub fn saved(&self) -> Vec<(PathBuf, SavedImage)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn saved_at(&self, path: &str) -> Option<SavedImage> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .find(|(saved_path, _)| saved_path == Path::new(path))
            .map(|(_, image)| image.clone())
    }

    fn file(&self, path: &Path) -> Result<&MemoryFile, CodecError> {
        self.files
            .get(path)
            .ok_or_else(|| CodecError::new("no such file"))
    }

    fn check(&self, path: &Path, stage: Failure) -> Result<(), CodecError> {
        match self.failures.get(path) {
            Some(Failure::Panic) if stage == Failure::Load => panic!("codec exploded"),
            Some(failure) if *failure == stage => Err(CodecError::new(format!("{stage:?} failed"))),
            _ => Ok(()),
        }
    }
}

impl Codec for MemoryCodec {
    fn parse_version(&self, path: &Path) -> Result<FormatVersion, CodecError> {
        self.check(path, Failure::Version)?;
        self.file(path)?;
        Ok(FormatVersion {
            number: 2,
            ..FormatVersion::default()
        })
    }

    fn parse_header(&self, path: &Path, _version: &FormatVersion) -> Result<ImageHeader, CodecError> {
        self.check(path, Failure::Header)?;
        Ok(self.file(path)?.header.clone())
    }

    fn load_image(&self, path: &Path, _header: &ImageHeader) -> Result<DecodedImage, CodecError> {
        if let Some(delay) = self.decode_delay {
            thread::sleep(delay);
        }
        self.check(path, Failure::Load)?;
        self.decoded.lock().unwrap().push(path.to_path_buf());
        Ok(DecodedImage {
            planes: self.file(path)?.planes.clone(),
        })
    }

    fn save_image(&self, path: &Path, composite: &Composite<'_>) -> Result<(), CodecError> {
        if self.failing_saves.iter().any(|failing| failing == path) {
            return Err(CodecError::new("disk full"));
        }

        let image = SavedImage {
            width: composite.header.width,
            height: composite.header.height,
            channels: composite
                .channels
                .iter()
                .map(|channel| SavedChannel {
                    name: channel.name.to_string(),
                    pixel_type: channel.pixel_type,
                    source: channel.source,
                    data: channel.data.to_vec(),
                })
                .collect(),
        };
        self.saved.lock().unwrap().push((path.to_path_buf(), image));
        Ok(())
    }
}
