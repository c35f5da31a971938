use std::path::PathBuf;

use crate::{Permission, ResourceKind};

/// Result alias that carries the custom [`SectionsError`] type.
pub type Result<T> = std::result::Result<T, SectionsError>;

/// Common error type for the core crate.
///
/// None of these are fatal: the application shell turns every one of them
/// into a transient [`Notice`](crate::Notice).
#[derive(Debug, thiserror::Error)]
pub enum SectionsError {
    /// A media resource failed to prepare or play.
    #[error("{kind} playback failed: {message}")]
    Playback { kind: ResourceKind, message: String },
    /// The video kept failing to prepare and automatic re-preparation gave up.
    #[error("{kind} could not be prepared after {attempts} attempts")]
    PlaybackExhausted { kind: ResourceKind, attempts: u32 },
    /// Saving the bundled image failed.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// The user declined one or more permissions. Informational only.
    #[error("permissions denied: {}", join_ids(.0))]
    PermissionDenied(Vec<Permission>),
    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form failure reported by a platform collaborator.
    #[error("{0}")]
    Message(String),
}

impl SectionsError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn playback<T: Into<String>>(kind: ResourceKind, message: T) -> Self {
        Self::Playback {
            kind,
            message: message.into(),
        }
    }
}

impl From<&str> for SectionsError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SectionsError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Failures of the one-shot image export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("could not decode bundled image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode PNG: {0}")]
    Encode(#[source] image::ImageError),
    #[error("no free file name left for `{}`", .0.display())]
    NameExhausted(PathBuf),
    #[error("export worker stopped unexpectedly")]
    Worker,
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

fn join_ids(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(|permission| permission.id())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_errors_name_the_resource() {
        let err = SectionsError::playback(ResourceKind::Audio, "decoder missing");
        assert_eq!(err.to_string(), "audio playback failed: decoder missing");
    }

    #[test]
    fn denied_permissions_list_platform_ids() {
        let err = SectionsError::PermissionDenied(vec![
            Permission::ReadMediaImages,
            Permission::ReadMediaVideo,
        ]);
        assert_eq!(
            err.to_string(),
            "permissions denied: android.permission.READ_MEDIA_IMAGES, android.permission.READ_MEDIA_VIDEO"
        );
    }
}
