use tracing::{debug, warn};

use crate::{PlatformErrorInfo, ResourceHandle, ResourceKind, Result, SectionsError};

/// Platform video widget the handle drives.
pub trait VideoSurface {
    /// Points the surface at a new source. Preparation is asynchronous: the
    /// platform later reports back through a prepared or an error signal.
    fn set_source(&mut self, uri: &str) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn seek_to(&mut self, position_ms: u64) -> Result<()>;
    fn stop_playback(&mut self) -> Result<()>;
    fn is_playing(&self) -> bool;
}

/// Lifecycle of the video resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoState {
    Uninitialized,
    Preparing,
    Ready,
    Playing,
    Paused,
    /// Re-preparation gave up. Only a reset or a fresh load leaves this state.
    Failed,
}

impl VideoState {
    /// Whether playback controls are valid to use.
    pub fn is_prepared(self) -> bool {
        matches!(self, VideoState::Ready | VideoState::Playing | VideoState::Paused)
    }
}

/// Owns the video surface and its playback state machine.
pub struct VideoHandle {
    surface: Box<dyn VideoSurface>,
    source: String,
    state: VideoState,
    failed_prepares: u32,
    max_prepare_retries: u32,
}

impl VideoHandle {
    pub fn new(
        surface: Box<dyn VideoSurface>,
        source: impl Into<String>,
        max_prepare_retries: u32,
    ) -> Self {
        Self {
            surface,
            source: source.into(),
            state: VideoState::Uninitialized,
            failed_prepares: 0,
            max_prepare_retries,
        }
    }

    pub fn state(&self) -> VideoState {
        self.state
    }

    /// Whether the pause/play button is enabled.
    pub fn controls_enabled(&self) -> bool {
        self.state.is_prepared()
    }

    pub fn failed_prepares(&self) -> u32 {
        self.failed_prepares
    }

    /// Arms the surface with the source and waits for the prepared signal.
    /// A source the surface rejects leaves the handle uninitialized so the
    /// next reset or switch loads it again.
    pub fn load(&mut self) -> Result<()> {
        match self.surface.set_source(&self.source) {
            Ok(()) => {
                self.state = VideoState::Preparing;
                Ok(())
            }
            Err(err) => {
                self.state = VideoState::Uninitialized;
                Err(err)
            }
        }
    }

    /// Platform signal: the source is ready to play.
    pub fn on_prepared(&mut self) -> bool {
        if self.state != VideoState::Preparing {
            debug!(state = ?self.state, "ignoring stale video prepared signal");
            return false;
        }
        self.state = VideoState::Ready;
        self.failed_prepares = 0;
        true
    }

    /// Play when ready or paused, pause while playing. Anything else is a
    /// no-op because the surface has not signalled readiness yet.
    pub fn toggle(&mut self) -> Result<VideoState> {
        match self.state {
            VideoState::Ready | VideoState::Paused => {
                self.surface.start()?;
                self.state = VideoState::Playing;
            }
            VideoState::Playing => {
                self.surface.pause()?;
                self.state = VideoState::Paused;
            }
            state => debug!(?state, "video toggle ignored until prepared"),
        }
        Ok(self.state)
    }

    /// Platform signal: playback reached the end. The video rewinds and sits
    /// paused at the start.
    pub fn on_completed(&mut self) -> Result<()> {
        if !self.state.is_prepared() {
            debug!(state = ?self.state, "ignoring video completion signal");
            return Ok(());
        }
        let rewound = self.surface.seek_to(0).and_then(|_| self.surface.pause());
        self.state = VideoState::Ready;
        rewound
    }

    /// Platform signal: the surface failed. Returns the error to report, or
    /// `None` when the handle was already released.
    ///
    /// Preparation is re-issued until `max_prepare_retries` consecutive
    /// failures, after which the handle parks in [`VideoState::Failed`].
    pub fn on_error(&mut self, info: PlatformErrorInfo) -> Option<SectionsError> {
        if self.state == VideoState::Uninitialized {
            debug!(%info, "ignoring video error after release");
            return None;
        }
        self.failed_prepares += 1;

        if self.failed_prepares > self.max_prepare_retries {
            if let Err(err) = self.surface.stop_playback() {
                warn!(%err, "stopping failed video surface");
            }
            self.state = VideoState::Failed;
            return Some(SectionsError::PlaybackExhausted {
                kind: ResourceKind::Video,
                attempts: self.failed_prepares,
            });
        }

        if let Err(err) = self.load() {
            warn!(%err, attempt = self.failed_prepares, "re-preparing video");
        }
        Some(SectionsError::playback(
            ResourceKind::Video,
            format!("could not play video {info}"),
        ))
    }
}

impl std::fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoHandle")
            .field("source", &self.source)
            .field("state", &self.state)
            .field("failed_prepares", &self.failed_prepares)
            .finish()
    }
}

impl ResourceHandle for VideoHandle {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Video
    }

    fn is_active(&self) -> bool {
        self.state == VideoState::Playing
    }

    fn start(&mut self) -> Result<()> {
        if matches!(self.state, VideoState::Ready | VideoState::Paused) {
            self.toggle()?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.state == VideoState::Playing {
            self.toggle()?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        if self.state == VideoState::Preparing {
            return Ok(());
        }
        let stopped = if self.state == VideoState::Playing || self.surface.is_playing() {
            self.surface.stop_playback()
        } else {
            Ok(())
        };
        self.failed_prepares = 0;
        let armed = self.load();
        stopped.and(armed)
    }

    fn release(&mut self) -> Result<()> {
        if self.state == VideoState::Uninitialized {
            return Ok(());
        }
        let stopped = if self.surface.is_playing() {
            self.surface.stop_playback()
        } else {
            Ok(())
        };
        self.state = VideoState::Uninitialized;
        self.failed_prepares = 0;
        stopped
    }
}
