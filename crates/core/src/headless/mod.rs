//! In-process stand-ins for the platform collaborators.
//!
//! The application shell runs against these when no real media stack is
//! attached, and the tests use them to observe which platform calls the
//! controller makes. Every backend writes to a shared [`CallLog`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    AudioBackend, AudioPlayer, Permission, PermissionPlatform, Result, SectionsError,
    VideoSurface,
};

/// Shared, append-only record of platform calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.lock().iter().any(|recorded| recorded == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.lock().iter().filter(|recorded| *recorded == entry).count()
    }

    // A panicking test thread must not hide the calls recorded before it.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Video surface that only tracks whether it is playing.
#[derive(Debug)]
pub struct HeadlessVideo {
    log: CallLog,
    playing: bool,
    source_failures: u32,
    fail_stop: bool,
}

impl HeadlessVideo {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            playing: false,
            source_failures: 0,
            fail_stop: false,
        }
    }

    /// Every `set_source` call fails, as with a missing or corrupt asset.
    pub fn with_failing_source(self) -> Self {
        self.with_source_failures(u32::MAX)
    }

    /// The next `count` calls to `set_source` fail, later ones succeed.
    pub fn with_source_failures(mut self, count: u32) -> Self {
        self.source_failures = count;
        self
    }

    /// `stop_playback` reports a failure after halting the surface.
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }
}

impl VideoSurface for HeadlessVideo {
    fn set_source(&mut self, uri: &str) -> Result<()> {
        self.log.record(format!("video:source {uri}"));
        self.playing = false;
        if self.source_failures > 0 {
            self.source_failures -= 1;
            return Err(SectionsError::msg(format!("cannot open `{uri}`")));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.log.record("video:start");
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.log.record("video:pause");
        self.playing = false;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.log.record(format!("video:seek {position_ms}"));
        Ok(())
    }

    fn stop_playback(&mut self) -> Result<()> {
        self.log.record("video:stop");
        self.playing = false;
        if self.fail_stop {
            return Err(SectionsError::msg("surface already released"));
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Audio backend whose players produce no sound.
#[derive(Debug)]
pub struct HeadlessAudio {
    log: CallLog,
    fail_create: bool,
    fail_stop: bool,
}

impl HeadlessAudio {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_create: false,
            fail_stop: false,
        }
    }

    /// Every `create` call fails, as with an undecodable track.
    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Players report a failure when stopped.
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }
}

impl AudioBackend for HeadlessAudio {
    fn create(&mut self, source: &str) -> Result<Box<dyn AudioPlayer>> {
        self.log.record(format!("audio:create {source}"));
        if self.fail_create {
            return Err(SectionsError::msg(format!("no decoder for `{source}`")));
        }
        Ok(Box::new(HeadlessPlayer {
            log: self.log.clone(),
            fail_stop: self.fail_stop,
        }))
    }
}

#[derive(Debug)]
struct HeadlessPlayer {
    log: CallLog,
    fail_stop: bool,
}

impl AudioPlayer for HeadlessPlayer {
    fn start(&mut self) -> Result<()> {
        self.log.record("audio:start");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.record("audio:stop");
        if self.fail_stop {
            return Err(SectionsError::msg("player in illegal state"));
        }
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.log.record(format!("audio:seek {position_ms}"));
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.log.record("audio:release");
        Ok(())
    }
}

/// Permission platform with a fixed API level and an in-memory grant set.
#[derive(Debug)]
pub struct HeadlessPermissions {
    sdk_level: u32,
    granted: HashSet<Permission>,
    requests: Vec<(i32, Vec<Permission>)>,
}

impl HeadlessPermissions {
    pub fn new(sdk_level: u32) -> Self {
        Self {
            sdk_level,
            granted: HashSet::new(),
            requests: Vec::new(),
        }
    }

    pub fn grant(&mut self, permission: Permission) {
        self.granted.insert(permission);
    }

    /// The most recent request that has not been answered yet.
    pub fn pending_request(&self) -> Option<&(i32, Vec<Permission>)> {
        self.requests.last()
    }

    pub fn take_pending_request(&mut self) -> Option<(i32, Vec<Permission>)> {
        self.requests.pop()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

impl PermissionPlatform for HeadlessPermissions {
    fn sdk_level(&self) -> u32 {
        self.sdk_level
    }

    fn is_granted(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    fn request(&mut self, request_code: i32, permissions: &[Permission]) {
        self.requests.push((request_code, permissions.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_tracks_playing_flag() {
        let log = CallLog::new();
        let mut video = HeadlessVideo::new(log.clone());

        video.start().unwrap();
        assert!(video.is_playing());
        video.pause().unwrap();
        assert!(!video.is_playing());
        assert_eq!(log.entries(), vec!["video:start", "video:pause"]);
    }

    #[test]
    fn failing_audio_backend_still_logs_attempt() {
        let log = CallLog::new();
        let mut audio = HeadlessAudio::new(log.clone()).with_failing_create();

        assert!(audio.create("track").is_err());
        assert!(log.contains("audio:create track"));
    }
}
