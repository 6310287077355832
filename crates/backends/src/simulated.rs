use crate::{HandleId, MediaBackend, MediaHandle, MediaStatus};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use castdeck_core::AudioMode;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

struct SimulatedMedia {
    duration_ms: u64,
    /// Position at the moment `playing_since` was taken, or the frozen
    /// position while paused.
    base_position_ms: u64,
    playing_since: Option<Instant>,
    finished: bool,
}

impl SimulatedMedia {
    fn position_ms(&self, now: Instant) -> u64 {
        let elapsed = self
            .playing_since
            .map(|since| now.duration_since(since).as_millis() as u64)
            .unwrap_or(0);
        self.base_position_ms
            .saturating_add(elapsed)
            .min(self.duration_ms)
    }

    fn freeze(&mut self, now: Instant) {
        self.base_position_ms = self.position_ms(now);
        self.playing_since = None;
    }
}

/// In-process stand-in for a platform media stack: every resource has a
/// fixed duration and plays against the tokio clock.
pub struct SimulatedBackend {
    duration_ms: u64,
    next_id: u64,
    media: HashMap<HandleId, SimulatedMedia>,
    audio_mode: Option<AudioMode>,
}

impl SimulatedBackend {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            next_id: 1,
            media: HashMap::new(),
            audio_mode: None,
        }
    }

    fn media_mut(&mut self, handle: &MediaHandle) -> Result<&mut SimulatedMedia> {
        self.media
            .get_mut(&handle.id())
            .ok_or_else(|| anyhow!("media {} is not loaded", handle.id()))
    }
}

#[async_trait]
impl MediaBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn configure(&mut self, mode: &AudioMode) -> Result<()> {
        debug!(?mode, "simulated audio mode configured");
        self.audio_mode = Some(*mode);
        Ok(())
    }

    async fn open(&mut self, url: &Url) -> Result<MediaHandle> {
        let id = HandleId(self.next_id);
        self.next_id += 1;

        let now = Instant::now();
        self.media.insert(
            id,
            SimulatedMedia {
                duration_ms: self.duration_ms,
                base_position_ms: 0,
                playing_since: Some(now),
                finished: false,
            },
        );
        debug!(handle = %id, %url, mode = ?self.audio_mode, "simulated media opened");
        Ok(MediaHandle::new(id, url.clone()))
    }

    async fn play(&mut self, handle: &MediaHandle) -> Result<()> {
        let media = self.media_mut(handle)?;
        media.finished = false;
        media.base_position_ms = 0;
        media.playing_since = Some(Instant::now());
        Ok(())
    }

    async fn pause(&mut self, handle: &MediaHandle) -> Result<()> {
        let media = self.media_mut(handle)?;
        media.freeze(Instant::now());
        Ok(())
    }

    async fn resume(&mut self, handle: &MediaHandle) -> Result<()> {
        let media = self.media_mut(handle)?;
        if media.finished {
            media.finished = false;
            media.base_position_ms = 0;
        }
        if media.playing_since.is_none() {
            media.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn stop(&mut self, handle: &MediaHandle) -> Result<()> {
        let media = self.media_mut(handle)?;
        media.playing_since = None;
        media.base_position_ms = 0;
        Ok(())
    }

    async fn seek(&mut self, handle: &MediaHandle, position_ms: u64) -> Result<()> {
        let now = Instant::now();
        let media = self.media_mut(handle)?;
        media.base_position_ms = position_ms.min(media.duration_ms);
        media.finished = false;
        if media.playing_since.is_some() {
            media.playing_since = Some(now);
        }
        Ok(())
    }

    async fn status(&mut self, handle: &MediaHandle) -> Result<MediaStatus> {
        let now = Instant::now();
        let media = self.media_mut(handle)?;
        let position_ms = media.position_ms(now);
        if media.playing_since.is_some() && position_ms >= media.duration_ms {
            media.freeze(now);
            media.finished = true;
        }
        Ok(MediaStatus {
            position_ms,
            duration_ms: media.duration_ms,
            is_loaded: true,
            finished: media.finished,
        })
    }

    async fn unload(&mut self, handle: MediaHandle) -> Result<()> {
        if self.media.remove(&handle.id()).is_some() {
            debug!(handle = %handle.id(), "simulated media unloaded");
        }
        Ok(())
    }
}
