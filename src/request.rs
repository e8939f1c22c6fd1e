//! Building merge requests from command-line arguments and manifests.
//!
//! An input argument names a file and, after the last `=`, a comma-separated
//! list of channel selectors:
//!
//! - a literal channel name (`R`, `N.X`),
//! - `@keyword` for every channel of a [`ChannelCategory`] (`@depth`),
//! - `*` for every channel in the file.
//!
//! An argument without `=` selects every channel. Selectors other than
//! literal names need the file's channel table, so they are resolved against
//! a header by [`InputArg::resolve`].
//!
//! # Example
//!
//! ```
//! use exrmerge::request::parse_input_arg;
//!
//! let arg = parse_input_arg("beauty.0001.exr=R,G,B,@depth").unwrap();
//! let available = vec!["A".to_string(), "B".to_string(), "G".to_string(), "R".to_string(), "Z".to_string()];
//! let spec = arg.resolve(&available);
//! assert_eq!(spec.channels.len(), 4);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::category::{ChannelCategory, classify};
use crate::error::MergeError;
use crate::sequence::InputFileSpec;

/// One entry of a channel selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// A single channel by exact name.
    Name(String),
    /// Every channel classified into the category.
    Category(ChannelCategory),
    /// Every channel.
    All,
}

impl ChannelSelector {
    /// Parse one selector token.
    pub fn parse(token: &str) -> Result<Self, MergeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(MergeError::InvalidManifest("empty channel selector".to_string()));
        }
        if token == "*" {
            return Ok(ChannelSelector::All);
        }
        if let Some(keyword) = token.strip_prefix('@') {
            return ChannelCategory::from_name(keyword)
                .map(ChannelSelector::Category)
                .ok_or_else(|| {
                    MergeError::InvalidManifest(format!("unknown channel category: {keyword}"))
                });
        }
        Ok(ChannelSelector::Name(token.to_string()))
    }

    /// Returns `true` if `channel` is selected.
    pub fn matches(&self, channel: &str) -> bool {
        match self {
            ChannelSelector::Name(name) => name == channel,
            ChannelSelector::Category(category) => classify(channel) == *category,
            ChannelSelector::All => true,
        }
    }
}

/// A parsed input argument, not yet resolved against a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputArg {
    /// Source file.
    pub path: PathBuf,
    /// Channel selectors; never empty.
    pub selectors: Vec<ChannelSelector>,
}

impl InputArg {
    /// Returns `true` if resolving needs the file's channel table.
    pub fn needs_header(&self) -> bool {
        self.selectors
            .iter()
            .any(|selector| !matches!(selector, ChannelSelector::Name(_)))
    }

    /// Build the file spec by matching the selectors against the channels
    /// the file provides.
    ///
    /// Literal names are kept even when missing from `available`; the merge
    /// simply finds nothing for them.
    pub fn resolve(&self, available: &[String]) -> InputFileSpec {
        let mut channels: Vec<String> = available
            .iter()
            .filter(|channel| self.selectors.iter().any(|selector| selector.matches(channel)))
            .cloned()
            .collect();

        for selector in &self.selectors {
            if let ChannelSelector::Name(name) = selector {
                channels.push(name.clone());
            }
        }

        InputFileSpec::new(self.path.clone(), channels)
    }

    /// Build the file spec from literal names only.
    ///
    /// Returns `None` if a selector needs the file's channel table.
    pub fn resolve_names(&self) -> Option<InputFileSpec> {
        if self.needs_header() {
            return None;
        }
        Some(self.resolve(&[]))
    }
}

/// Parse `path[=selector,selector,...]`.
pub fn parse_input_arg(arg: &str) -> Result<InputArg, MergeError> {
    let (path, selectors) = match arg.rsplit_once('=') {
        Some((path, list)) => {
            let selectors = list
                .split(',')
                .map(ChannelSelector::parse)
                .collect::<Result<Vec<_>, _>>()?;
            (path, selectors)
        }
        None => (arg, vec![ChannelSelector::All]),
    };

    if path.is_empty() {
        return Err(MergeError::InvalidManifest(format!(
            "input argument has no path: {arg}"
        )));
    }

    Ok(InputArg {
        path: PathBuf::from(path),
        selectors,
    })
}

/// A JSON description of a whole merge.
///
/// ```json
/// {
///   "output": "merged.####.exr",
///   "threads": 0,
///   "files": [
///     { "path": "beauty.0001.exr", "channels": ["R", "G", "B"] },
///     { "path": "aux.0001.exr", "channels": ["@depth"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeManifest {
    /// Output path template.
    pub output: String,
    /// Worker threads; `0` or absent means automatic.
    #[serde(default)]
    pub threads: usize,
    /// Input files in merge order.
    pub files: Vec<ManifestFile>,
}

/// One file entry of a [`MergeManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestFile {
    /// Source file.
    pub path: PathBuf,
    /// Channel selectors; absent means every channel.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl ManifestFile {
    /// Parse the entry's selectors.
    pub fn to_input_arg(&self) -> Result<InputArg, MergeError> {
        let selectors = if self.channels.is_empty() {
            vec![ChannelSelector::All]
        } else {
            self.channels
                .iter()
                .map(|token| ChannelSelector::parse(token))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(InputArg {
            path: self.path.clone(),
            selectors,
        })
    }
}

impl MergeManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, MergeError> {
        let manifest: MergeManifest = serde_json::from_str(text)?;
        if manifest.output.is_empty() {
            return Err(MergeError::InvalidManifest("output template is empty".to_string()));
        }
        Ok(manifest)
    }

    /// Parse every file entry into an input argument.
    pub fn input_args(&self) -> Result<Vec<InputArg>, MergeError> {
        self.files.iter().map(ManifestFile::to_input_arg).collect()
    }
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<MergeManifest, MergeError> {
    log::debug!("Loading merge manifest: {}", path.display());
    let text = fs::read_to_string(path)?;
    MergeManifest::from_json(&text)
}
