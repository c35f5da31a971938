use tracing::{debug, warn};

use crate::{ResourceHandle, ResourceKind, Result};

/// Factory for platform audio players.
pub trait AudioBackend {
    fn create(&mut self, source: &str) -> Result<Box<dyn AudioPlayer>>;
}

/// One decoded track held by the platform.
pub trait AudioPlayer {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn seek_to(&mut self, position_ms: u64) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

/// Music section handle. The player is created on the first play request and
/// released on every stop.
pub struct AudioHandle {
    backend: Box<dyn AudioBackend>,
    source: String,
    player: Option<Box<dyn AudioPlayer>>,
    playing: bool,
}

impl AudioHandle {
    pub fn new(backend: Box<dyn AudioBackend>, source: impl Into<String>) -> Self {
        Self {
            backend,
            source: source.into(),
            player: None,
            playing: false,
        }
    }

    /// Whether a platform player is currently held.
    pub fn is_created(&self) -> bool {
        self.player.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Starts the track, creating the player first if needed. Playing an
    /// already playing track does nothing.
    pub fn play(&mut self) -> Result<()> {
        if self.playing {
            return Ok(());
        }
        let player = self.ensure_player()?;
        player.start()?;
        self.playing = true;
        Ok(())
    }

    /// Rewinds to the beginning and plays.
    pub fn restart(&mut self) -> Result<()> {
        let rewind = self.player.is_some();
        let player = self.ensure_player()?;
        if rewind {
            player.seek_to(0)?;
        }
        player.start()?;
        self.playing = true;
        Ok(())
    }

    /// Stops playback and releases the player.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut player) = self.player.take() else {
            return Ok(());
        };
        let stopped = if self.playing { player.stop() } else { Ok(()) };
        self.playing = false;
        if let Err(err) = &stopped {
            warn!(%err, "stopping audio player");
        }
        player.release().and(stopped)
    }

    /// Platform signal: the track ended. The player is kept so a restart
    /// does not need to decode again.
    pub fn on_completed(&mut self) {
        debug!(source = %self.source, "audio playback completed");
        self.playing = false;
    }

    fn ensure_player(&mut self) -> Result<&mut Box<dyn AudioPlayer>> {
        let player = match self.player.take() {
            Some(player) => player,
            None => self.backend.create(&self.source)?,
        };
        Ok(self.player.insert(player))
    }
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioHandle")
            .field("source", &self.source)
            .field("created", &self.player.is_some())
            .field("playing", &self.playing)
            .finish()
    }
}

impl ResourceHandle for AudioHandle {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Audio
    }

    fn is_active(&self) -> bool {
        self.playing
    }

    fn start(&mut self) -> Result<()> {
        self.play()
    }

    fn stop(&mut self) -> Result<()> {
        AudioHandle::stop(self)
    }

    fn reset(&mut self) -> Result<()> {
        AudioHandle::stop(self)
    }

    fn release(&mut self) -> Result<()> {
        AudioHandle::stop(self)
    }
}
