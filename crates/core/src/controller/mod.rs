//! Section lifecycle and mutual exclusion.
//!
//! [`SectionController`] is the only owner of the visible section and of the
//! three resource handles. Every public operation leaves at most one handle
//! active, and that handle always belongs to the visible section.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    AnimationHandle, AppConfig, AudioBackend, AudioHandle, Notice, PlatformErrorInfo,
    ResourceHandle, ResourceKind, Section, SectionsError, VideoHandle, VideoState, VideoSurface,
};

/// Outcome of a section switch.
#[derive(Debug)]
pub struct SwitchReport {
    pub previous: Section,
    pub active: Section,
    /// Platform failures swallowed while resetting the other sections.
    pub failures: Vec<SectionsError>,
}

impl SwitchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct SectionController {
    active: Section,
    video: VideoHandle,
    music: AudioHandle,
    animation: AnimationHandle,
    notices: Vec<Notice>,
}

impl SectionController {
    /// Builds the controller with the video section showing and the video
    /// source already being prepared.
    pub fn new(
        config: &AppConfig,
        surface: Box<dyn VideoSurface>,
        audio: Box<dyn AudioBackend>,
    ) -> Self {
        let mut controller = Self {
            active: Section::Video,
            video: VideoHandle::new(
                surface,
                config.assets.video_uri.clone(),
                config.video.max_prepare_retries,
            ),
            music: AudioHandle::new(audio, config.assets.music_uri.clone()),
            animation: AnimationHandle::new(&config.animation),
            notices: Vec::new(),
        };
        if let Err(err) = controller.video.load() {
            controller.report(&err);
        }
        controller
    }

    pub fn active(&self) -> Section {
        self.active
    }

    pub fn is_visible(&self, section: Section) -> bool {
        self.active == section
    }

    pub fn video(&self) -> &VideoHandle {
        &self.video
    }

    pub fn music(&self) -> &AudioHandle {
        &self.music
    }

    pub fn animation(&self) -> &AnimationHandle {
        &self.animation
    }

    /// Kinds of every resource currently producing output.
    pub fn active_resources(&self) -> Vec<ResourceKind> {
        Section::ALL
            .into_iter()
            .filter_map(|section| self.handle(section))
            .filter(|handle| handle.is_active())
            .map(|handle| handle.kind())
            .collect()
    }

    /// Drains the notices produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Bottom bar entry point.
    pub fn select_section(&mut self, target: Section) -> SwitchReport {
        self.switch_to(target)
    }

    /// Shows `target` after resetting the resources of every other section.
    ///
    /// Never fails: reset failures are logged, collected in the report and
    /// surfaced as a single notice.
    pub fn switch_to(&mut self, target: Section) -> SwitchReport {
        let previous = self.active;
        let mut failures = Vec::new();

        for section in Section::ALL.into_iter().filter(|section| *section != target) {
            if let Some(handle) = self.handle_mut(section) {
                if let Err(err) = handle.reset() {
                    warn!(%section, %err, "resetting section resource");
                    failures.push(err);
                }
            }
        }

        self.active = target;

        match target {
            Section::Video if self.video.state() == VideoState::Uninitialized => {
                if let Err(err) = self.video.load() {
                    warn!(%err, "loading video");
                    failures.push(err);
                }
            }
            Section::Animation => self.animation.start(),
            _ => {}
        }

        if previous != target {
            info!(from = %previous, to = %target, "switched section");
        }

        self.report_all(&failures);

        SwitchReport {
            previous,
            active: target,
            failures,
        }
    }

    /// Play/pause button of the video section. Returns `None` when the video
    /// section is not showing.
    pub fn toggle_video(&mut self) -> Option<VideoState> {
        if self.active != Section::Video {
            debug!(active = %self.active, "video toggle outside video section");
            return None;
        }
        if let Err(err) = self.video.toggle() {
            self.notices.push(Notice::action_failed("Video", &err));
        }
        Some(self.video.state())
    }

    /// Play button of the music section. Returns whether music is playing.
    pub fn play_music(&mut self) -> bool {
        if self.active != Section::Music {
            debug!(active = %self.active, "music play outside music section");
            return false;
        }
        if let Err(err) = self.music.play() {
            self.notices.push(Notice::action_failed("Play", &err));
        }
        self.music.is_playing()
    }

    /// Stop button of the music section. Always safe to call.
    pub fn stop_music(&mut self) {
        if let Err(err) = self.music.stop() {
            warn!(%err, "stopping music");
            self.notices.push(Notice::action_failed("Stop", &err));
        }
    }

    /// Restart button of the music section. Returns whether music is playing.
    pub fn restart_music(&mut self) -> bool {
        if self.active != Section::Music {
            debug!(active = %self.active, "music restart outside music section");
            return false;
        }
        if let Err(err) = self.music.restart() {
            self.notices.push(Notice::action_failed("Restart", &err));
        }
        self.music.is_playing()
    }

    /// Advances the animation loop by one frame.
    pub fn tick(&mut self, delta: Duration) {
        self.animation.tick(delta);
    }

    /// Platform signal: a resource finished preparing.
    pub fn on_resource_prepared(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Video => {
                if self.video.on_prepared() {
                    debug!("video prepared, controls enabled");
                }
            }
            other => debug!(kind = %other, "prepared signal has no effect"),
        }
    }

    /// Platform signal: a resource played to its end.
    pub fn on_resource_completed(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Video => {
                if let Err(err) = self.video.on_completed() {
                    warn!(%err, "rewinding completed video");
                }
            }
            ResourceKind::Audio => self.music.on_completed(),
            ResourceKind::Animation => debug!("animation loops never complete"),
        }
    }

    /// Platform signal: a resource failed. The failure is reported and the
    /// handle re-initialised so the next attempt starts clean. A late video
    /// error arriving after teardown is dropped.
    pub fn on_resource_error(&mut self, kind: ResourceKind, info: PlatformErrorInfo) {
        let err = match kind {
            ResourceKind::Video => {
                let Some(err) = self.video.on_error(info) else {
                    return;
                };
                err
            }
            ResourceKind::Audio => {
                if let Err(err) = self.music.stop() {
                    warn!(%err, "releasing failed audio player");
                }
                SectionsError::playback(kind, format!("could not play audio {info}"))
            }
            ResourceKind::Animation => {
                if let Err(err) = self.animation.reset() {
                    warn!(%err, "resetting failed animation");
                }
                SectionsError::playback(kind, format!("animation stopped {info}"))
            }
        };
        warn!(%kind, %err, "resource error");
        self.report(&err);
    }

    /// Stops and releases every resource regardless of the visible section.
    /// Release failures are surfaced as one notice. Calling it again is a
    /// no-op.
    pub fn teardown_all(&mut self) -> Vec<SectionsError> {
        let mut failures = Vec::new();
        for section in Section::ALL {
            if let Some(handle) = self.handle_mut(section) {
                if let Err(err) = handle.release() {
                    warn!(%section, %err, "releasing section resource");
                    failures.push(err);
                }
            }
        }
        debug!(failures = failures.len(), "tore down all resources");
        self.report_all(&failures);
        failures
    }

    /// Back in the foreground: re-arm the video if it is showing.
    pub fn resume(&mut self) {
        if self.active == Section::Video && self.video.state() == VideoState::Uninitialized {
            if let Err(err) = self.video.load() {
                self.report(&err);
            }
        }
    }

    fn report(&mut self, err: &SectionsError) {
        self.notices.push(Notice::from(err));
    }

    /// One notice for a batch of failures, however many there were.
    fn report_all(&mut self, failures: &[SectionsError]) {
        match failures {
            [] => {}
            [only] => self.report(only),
            [first, rest @ ..] => self
                .notices
                .push(Notice::long(format!("{first} (and {} more)", rest.len()))),
        }
    }

    fn handle(&self, section: Section) -> Option<&dyn ResourceHandle> {
        match section {
            Section::Video => Some(&self.video),
            Section::Music => Some(&self.music),
            Section::Image => None,
            Section::Animation => Some(&self.animation),
        }
    }

    fn handle_mut(&mut self, section: Section) -> Option<&mut dyn ResourceHandle> {
        match section {
            Section::Video => Some(&mut self.video),
            Section::Music => Some(&mut self.music),
            Section::Image => None,
            Section::Animation => Some(&mut self.animation),
        }
    }
}

impl std::fmt::Debug for SectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionController")
            .field("active", &self.active)
            .field("video", &self.video)
            .field("music", &self.music)
            .field("animation", &self.animation)
            .field("pending_notices", &self.notices.len())
            .finish()
    }
}
