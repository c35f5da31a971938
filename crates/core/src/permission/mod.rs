use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Notice, SectionsError};

/// Request code attached to the media permission request.
pub const PERMISSION_REQUEST_CODE: i32 = 1001;
/// Grant result reported by the platform for an accepted permission.
pub const PERMISSION_GRANTED: i32 = 0;
pub const PERMISSION_DENIED: i32 = -1;

/// First API level with per-media read permissions.
pub const MEDIA_PERMISSIONS_SDK: u32 = 33;

/// Storage and media permissions the application asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ReadExternalStorage,
    WriteExternalStorage,
    ReadMediaImages,
    ReadMediaAudio,
    ReadMediaVideo,
}

impl Permission {
    pub const LEGACY: [Permission; 2] = [
        Permission::ReadExternalStorage,
        Permission::WriteExternalStorage,
    ];

    pub const MEDIA: [Permission; 3] = [
        Permission::ReadMediaImages,
        Permission::ReadMediaAudio,
        Permission::ReadMediaVideo,
    ];

    /// Platform identifier, e.g. `android.permission.READ_MEDIA_IMAGES`.
    pub fn id(self) -> &'static str {
        match self {
            Permission::ReadExternalStorage => "android.permission.READ_EXTERNAL_STORAGE",
            Permission::WriteExternalStorage => "android.permission.WRITE_EXTERNAL_STORAGE",
            Permission::ReadMediaImages => "android.permission.READ_MEDIA_IMAGES",
            Permission::ReadMediaAudio => "android.permission.READ_MEDIA_AUDIO",
            Permission::ReadMediaVideo => "android.permission.READ_MEDIA_VIDEO",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::LEGACY
            .into_iter()
            .chain(Self::MEDIA)
            .find(|permission| permission.id() == id)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Permission {
    type Err = SectionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::from_id(value)
            .or_else(|| Self::from_id(&format!("android.permission.{}", value.to_ascii_uppercase())))
            .ok_or_else(|| SectionsError::msg(format!("unknown permission `{value}`")))
    }
}

/// Platform side of the permission flow.
pub trait PermissionPlatform {
    fn sdk_level(&self) -> u32;
    fn is_granted(&self, permission: Permission) -> bool;
    /// Shows the system dialog. The answer arrives later through
    /// [`PermissionGate::on_result`].
    fn request(&mut self, request_code: i32, permissions: &[Permission]);
}

/// Per-permission answer from the system dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionOutcome {
    pub results: Vec<(Permission, bool)>,
}

impl PermissionOutcome {
    /// True only when the dialog answered and every permission was granted.
    pub fn all_granted(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|(_, granted)| *granted)
    }

    pub fn denied(&self) -> Vec<Permission> {
        self.results
            .iter()
            .filter(|(_, granted)| !granted)
            .map(|(permission, _)| *permission)
            .collect()
    }

    /// Informational notice. Nothing else depends on the answer.
    pub fn notice(&self) -> Notice {
        if self.all_granted() {
            Notice::short("Permissions granted")
        } else {
            Notice::short("Permissions denied")
        }
    }

    pub fn into_result(self) -> Result<(), SectionsError> {
        if self.all_granted() {
            Ok(())
        } else {
            Err(SectionsError::PermissionDenied(self.denied()))
        }
    }
}

/// Stateless wrapper around the platform permission flow.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate {
    request_code: i32,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            request_code: PERMISSION_REQUEST_CODE,
        }
    }

    pub fn request_code(&self) -> i32 {
        self.request_code
    }

    /// The permission group the application needs on `sdk_level`.
    pub fn required(sdk_level: u32) -> &'static [Permission] {
        if sdk_level >= MEDIA_PERMISSIONS_SDK {
            &Permission::MEDIA
        } else {
            &Permission::LEGACY
        }
    }

    /// Required permissions that have not been granted yet.
    pub fn request_needed(&self, platform: &dyn PermissionPlatform) -> Vec<Permission> {
        Self::required(platform.sdk_level())
            .iter()
            .copied()
            .filter(|permission| !platform.is_granted(*permission))
            .collect()
    }

    /// Asks for the whole group when any member is missing. Returns the
    /// permissions that were requested.
    pub fn request_missing(&self, platform: &mut dyn PermissionPlatform) -> Vec<Permission> {
        if self.request_needed(platform).is_empty() {
            return Vec::new();
        }
        let group = Self::required(platform.sdk_level()).to_vec();
        platform.request(self.request_code, &group);
        group
    }

    /// Pairs the dialog answer up. Answers to other request codes are not
    /// ours and yield `None`; unknown ids are skipped.
    pub fn on_result<S: AsRef<str>>(
        &self,
        request_code: i32,
        permissions: &[S],
        grant_results: &[i32],
    ) -> Option<PermissionOutcome> {
        if request_code != self.request_code {
            return None;
        }
        let results = permissions
            .iter()
            .zip(grant_results)
            .filter_map(|(id, grant)| match Permission::from_id(id.as_ref()) {
                Some(permission) => Some((permission, *grant == PERMISSION_GRANTED)),
                None => {
                    debug!(id = id.as_ref(), "skipping unknown permission in answer");
                    None
                }
            })
            .collect();
        Some(PermissionOutcome { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessPermissions;

    #[test]
    fn legacy_and_media_groups_split_at_33() {
        assert_eq!(PermissionGate::required(26), &Permission::LEGACY);
        assert_eq!(PermissionGate::required(32), &Permission::LEGACY);
        assert_eq!(PermissionGate::required(33), &Permission::MEDIA);
    }

    #[test]
    fn requests_whole_group_when_one_is_missing() {
        let gate = PermissionGate::new();
        let mut platform = HeadlessPermissions::new(34);
        platform.grant(Permission::ReadMediaImages);
        platform.grant(Permission::ReadMediaAudio);

        assert_eq!(gate.request_needed(&platform), vec![Permission::ReadMediaVideo]);
        let requested = gate.request_missing(&mut platform);

        assert_eq!(requested, Permission::MEDIA.to_vec());
        let (code, permissions) = platform.pending_request().unwrap();
        assert_eq!(*code, PERMISSION_REQUEST_CODE);
        assert_eq!(permissions.len(), 3);
    }

    #[test]
    fn skips_request_when_everything_is_granted() {
        let gate = PermissionGate::new();
        let mut platform = HeadlessPermissions::new(28);
        for permission in Permission::LEGACY {
            platform.grant(permission);
        }

        assert!(gate.request_missing(&mut platform).is_empty());
        assert_eq!(platform.request_count(), 0);
    }

    #[test]
    fn answer_is_consumed_pairwise() {
        let gate = PermissionGate::new();
        let outcome = gate
            .on_result(
                PERMISSION_REQUEST_CODE,
                &[
                    "android.permission.READ_MEDIA_IMAGES",
                    "android.permission.READ_MEDIA_AUDIO",
                    "android.permission.READ_MEDIA_VIDEO",
                ],
                &[PERMISSION_GRANTED, PERMISSION_DENIED, PERMISSION_GRANTED],
            )
            .unwrap();

        assert!(!outcome.all_granted());
        assert_eq!(outcome.denied(), vec![Permission::ReadMediaAudio]);
        assert_eq!(outcome.notice().message, "Permissions denied");
        assert!(matches!(
            outcome.into_result(),
            Err(SectionsError::PermissionDenied(denied)) if denied == vec![Permission::ReadMediaAudio]
        ));
    }

    #[test]
    fn empty_answer_counts_as_denied() {
        let gate = PermissionGate::new();
        let outcome = gate
            .on_result::<&str>(PERMISSION_REQUEST_CODE, &[], &[])
            .unwrap();
        assert!(!outcome.all_granted());
    }

    #[test]
    fn ignores_foreign_request_codes_and_unknown_ids() {
        let gate = PermissionGate::new();
        assert!(gate.on_result(7, &["x"], &[PERMISSION_GRANTED]).is_none());

        let outcome = gate
            .on_result(
                PERMISSION_REQUEST_CODE,
                &["android.permission.CAMERA", "android.permission.READ_EXTERNAL_STORAGE"],
                &[PERMISSION_DENIED, PERMISSION_GRANTED],
            )
            .unwrap();
        assert!(outcome.all_granted());
        assert_eq!(outcome.notice().message, "Permissions granted");
    }

    #[test]
    fn parses_short_names() {
        assert_eq!(
            "read_media_video".parse::<Permission>().unwrap(),
            Permission::ReadMediaVideo
        );
        assert!("camera".parse::<Permission>().is_err());
    }
}
