use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assets: AssetsConfig,
    pub video: VideoConfig,
    pub animation: AnimationConfig,
    pub export: ExportSettings,
    pub permissions: PermissionConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Locations of the media bundled with the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub video_uri: String,
    pub music_uri: String,
    pub image_path: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            video_uri: "res://raw/video".to_string(),
            music_uri: "res://raw/musica".to_string(),
            image_path: PathBuf::from("assets/gato.png"),
        }
    }
}

/// Configuration specific to the video section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// How many consecutive error signals are answered with a fresh prepare
    /// before the video is marked as failed.
    pub max_prepare_retries: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_prepare_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Peak vertical offset of the looping image.
    pub amplitude: f32,
    /// Duration of one leg of the loop in milliseconds.
    pub period_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            amplitude: 20.0,
            period_ms: 700,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub pictures_dir: PathBuf,
    pub file_prefix: String,
    /// Optional journal file standing in for the platform media index.
    pub media_index: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            pictures_dir: PathBuf::from("Pictures"),
            file_prefix: "gato".to_string(),
            media_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Platform API level reported to the permission gate.
    pub sdk_level: u32,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self { sdk_level: 33 }
    }
}
