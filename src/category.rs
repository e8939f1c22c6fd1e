//! Channel categories.
//!
//! Renderers name their passes by convention (`R`, `N.X`, `AO.G`,
//! `crypto_object00.r`, ...). Categories let a front end select a whole pass
//! at once instead of listing each channel. Classification walks
//! [`ChannelCategory::ALL`] in order and stops at the first match, so
//! [`Other`](ChannelCategory::Other) only collects what nothing else claims.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// A named family of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelCategory {
    /// Beauty color: `R`, `G`, `B`, `A`.
    Color,
    /// Normals: `N.X`, `N.Y`, `N.Z`.
    Normal,
    /// Depth: `Z`.
    Depth,
    /// Ambient occlusion: `AO.R`, `AO.G`, `AO.B`, `AO.A`.
    AmbientOcclusion,
    /// Cryptomatte object IDs.
    CryptoObject,
    /// Cryptomatte material IDs.
    CryptoMaterial,
    /// Adaptive sampling density.
    SampleDensity,
    /// Per-pixel variance.
    Variance,
    /// Denoiser passes.
    Denoise,
    /// Everything else.
    Other,
}

impl ChannelCategory {
    /// Every category in matching order.
    pub const ALL: [ChannelCategory; 10] = [
        ChannelCategory::Color,
        ChannelCategory::Normal,
        ChannelCategory::Depth,
        ChannelCategory::AmbientOcclusion,
        ChannelCategory::CryptoObject,
        ChannelCategory::CryptoMaterial,
        ChannelCategory::SampleDensity,
        ChannelCategory::Variance,
        ChannelCategory::Denoise,
        ChannelCategory::Other,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ChannelCategory::Color => "Color (Beauty)",
            ChannelCategory::Normal => "Normal (N)",
            ChannelCategory::Depth => "Depth (Z)",
            ChannelCategory::AmbientOcclusion => "Ambient Occlusion (AO)",
            ChannelCategory::CryptoObject => "Crypto Object",
            ChannelCategory::CryptoMaterial => "Crypto Material",
            ChannelCategory::SampleDensity => "Sample density",
            ChannelCategory::Variance => "Variance",
            ChannelCategory::Denoise => "Noice",
            ChannelCategory::Other => "Others",
        }
    }

    /// Short keyword used on the command line (`@color`, `@depth`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            ChannelCategory::Color => "color",
            ChannelCategory::Normal => "normal",
            ChannelCategory::Depth => "depth",
            ChannelCategory::AmbientOcclusion => "ao",
            ChannelCategory::CryptoObject => "crypto-object",
            ChannelCategory::CryptoMaterial => "crypto-material",
            ChannelCategory::SampleDensity => "density",
            ChannelCategory::Variance => "variance",
            ChannelCategory::Denoise => "denoise",
            ChannelCategory::Other => "other",
        }
    }

    /// Parse a keyword, case-insensitively. A few aliases are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "color" | "colour" | "beauty" | "rgba" => Some(ChannelCategory::Color),
            "normal" | "normals" | "n" => Some(ChannelCategory::Normal),
            "depth" | "z" => Some(ChannelCategory::Depth),
            "ao" | "occlusion" => Some(ChannelCategory::AmbientOcclusion),
            "crypto-object" | "crypto_object" => Some(ChannelCategory::CryptoObject),
            "crypto-material" | "crypto_material" => Some(ChannelCategory::CryptoMaterial),
            "density" | "sample-density" => Some(ChannelCategory::SampleDensity),
            "variance" => Some(ChannelCategory::Variance),
            "denoise" | "noice" => Some(ChannelCategory::Denoise),
            "other" | "others" => Some(ChannelCategory::Other),
            _ => None,
        }
    }

    /// Returns `true` if `channel` belongs to this category, ignoring
    /// earlier categories in the matching order.
    pub fn matches(self, channel: &str) -> bool {
        match self {
            ChannelCategory::Color => matches!(channel, "R" | "G" | "B" | "A"),
            ChannelCategory::Normal => matches!(channel, "N.X" | "N.Y" | "N.Z"),
            ChannelCategory::Depth => channel == "Z",
            ChannelCategory::AmbientOcclusion => {
                matches!(channel, "AO.R" | "AO.G" | "AO.B" | "AO.A")
            }
            ChannelCategory::CryptoObject => channel.starts_with("crypto_object"),
            ChannelCategory::CryptoMaterial => channel.starts_with("crypto_material"),
            ChannelCategory::SampleDensity => channel.starts_with("AA_inv_density"),
            ChannelCategory::Variance => channel.starts_with("variance"),
            ChannelCategory::Denoise => channel.contains("noice"),
            ChannelCategory::Other => true,
        }
    }
}

impl Display for ChannelCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.label())
    }
}

/// The first category in matching order that claims `channel`.
pub fn classify(channel: &str) -> ChannelCategory {
    ChannelCategory::ALL
        .into_iter()
        .find(|category| category.matches(channel))
        .unwrap_or(ChannelCategory::Other)
}

/// Group channel names by category.
///
/// Only non-empty categories are returned, in matching order; channels keep
/// their input order within a category.
pub fn group_channels<I, S>(channels: I) -> Vec<(ChannelCategory, Vec<String>)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut groups: Vec<(ChannelCategory, Vec<String>)> = ChannelCategory::ALL
        .into_iter()
        .map(|category| (category, Vec::new()))
        .collect();

    for channel in channels {
        let channel = channel.into();
        let category = classify(&channel);
        if let Some((_, members)) = groups.iter_mut().find(|(c, _)| *c == category) {
            members.push(channel);
        }
    }

    groups.retain(|(_, members)| !members.is_empty());
    groups
}
