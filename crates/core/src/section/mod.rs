use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ResourceKind, SectionsError};

/// One of the four mutually exclusive screens reachable from the bottom bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Video,
    Music,
    Image,
    #[serde(rename = "anim", alias = "animation")]
    Animation,
}

impl Section {
    /// All sections in bottom bar order.
    pub const ALL: [Section; 4] = [
        Section::Video,
        Section::Music,
        Section::Image,
        Section::Animation,
    ];

    /// The resource owned by this section, if any. The image section saves a
    /// file but holds nothing that keeps running.
    pub fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            Section::Video => Some(ResourceKind::Video),
            Section::Music => Some(ResourceKind::Audio),
            Section::Image => None,
            Section::Animation => Some(ResourceKind::Animation),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Section::Video => "video",
            Section::Music => "music",
            Section::Image => "image",
            Section::Animation => "anim",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Section {
    type Err = SectionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Section::Video),
            "music" => Ok(Section::Music),
            "image" => Ok(Section::Image),
            "anim" | "animation" => Ok(Section::Animation),
            other => Err(SectionsError::msg(format!("unknown section `{other}`"))),
        }
    }
}
