use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SectionsError;

/// How long a notice stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeDuration {
    Short,
    Long,
}

/// Transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub duration: NoticeDuration,
}

impl Notice {
    pub fn short(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: NoticeDuration::Short,
        }
    }

    pub fn long(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: NoticeDuration::Long,
        }
    }

    /// Notice for a failed user action, e.g. `Play error: ...`.
    pub fn action_failed(action: &str, err: &SectionsError) -> Self {
        Self::long(format!("{action} error: {err}"))
    }
}

impl From<&SectionsError> for Notice {
    fn from(err: &SectionsError) -> Self {
        match err {
            SectionsError::Playback { .. } | SectionsError::PermissionDenied(_) => {
                Self::short(err.to_string())
            }
            _ => Self::long(err.to_string()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
