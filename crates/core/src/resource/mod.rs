use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Kind of controllable platform resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Audio,
    Animation,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Video => "video",
            ResourceKind::Audio => "audio",
            ResourceKind::Animation => "animation",
        })
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = crate::SectionsError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(ResourceKind::Video),
            "audio" | "music" => Ok(ResourceKind::Audio),
            "animation" | "anim" => Ok(ResourceKind::Animation),
            other => Err(crate::SectionsError::msg(format!(
                "unknown resource kind `{other}`"
            ))),
        }
    }
}

/// Codes delivered with a platform error signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformErrorInfo {
    pub what: i32,
    pub extra: i32,
}

impl PlatformErrorInfo {
    pub fn new(what: i32, extra: i32) -> Self {
        Self { what, extra }
    }
}

impl fmt::Display for PlatformErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.what, self.extra)
    }
}

/// Uniform contract over one external media or animation resource.
///
/// Every operation is idempotent. A failing platform call is reported through
/// the returned error but the handle is still left consistent, and after
/// [`reset`](ResourceHandle::reset) a following [`start`](ResourceHandle::start)
/// is always valid.
pub trait ResourceHandle {
    fn kind(&self) -> ResourceKind;

    /// Whether the resource is currently producing output.
    fn is_active(&self) -> bool;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Stops the resource and rewinds it to a startable state.
    fn reset(&mut self) -> Result<()>;

    /// Frees every native resource. The handle re-creates them lazily.
    fn release(&mut self) -> Result<()>;
}
