//! Core library for the Media Sections application.
//!
//! The application shows one of four sections at a time: video, music, image
//! and animation. [`SectionController`] owns which section is visible and the
//! resources that may run inside it; everything the platform provides (video
//! surface, audio decoder, permission dialog, media index) sits behind a trait
//! so the controller can be driven by the headless backends in [`headless`].

pub mod animation;
pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod headless;
pub mod notice;
pub mod permission;
pub mod resource;
pub mod section;
pub mod video;

pub use animation::{AnimationHandle, LoopAnimation};
pub use audio::{AudioBackend, AudioHandle, AudioPlayer};
pub use config::{
    AnimationConfig, AppConfig, AssetsConfig, ExportSettings, PermissionConfig, VideoConfig,
};
pub use controller::{SectionController, SwitchReport};
pub use error::{ExportError, Result, SectionsError};
pub use export::{
    ExportTask, ImageExporter, ImageSource, JournalMediaIndex, MediaIndex, TracingMediaIndex,
};
pub use headless::{CallLog, HeadlessAudio, HeadlessPermissions, HeadlessVideo};
pub use notice::{Notice, NoticeDuration};
pub use permission::{Permission, PermissionGate, PermissionOutcome, PermissionPlatform};
pub use resource::{PlatformErrorInfo, ResourceHandle, ResourceKind};
pub use section::Section;
pub use video::{VideoHandle, VideoState, VideoSurface};
