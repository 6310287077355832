use crate::error::PlaybackError;
use crate::probe::SourceProbe;
use crate::refresh::RefreshCycle;
use castdeck_backends::{HandleId, MediaBackend, MediaHandle, MediaStatus};
use castdeck_core::{
    is_remote, parse_source, AppConfig, AudioMode, PlaybackPhase, PlaybackState, Track,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_interval: Duration,
    pub open_timeout: Duration,
    pub open_retries: u32,
    pub audio_mode: AudioMode,
}

impl SessionConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            refresh_interval: Duration::from_millis(cfg.intervals.position_refresh_ms.max(100)),
            open_timeout: Duration::from_millis(cfg.intervals.open_timeout_ms.max(1)),
            open_retries: cfg.open_retries,
            audio_mode: cfg.audio,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

/// Single authority over what is currently playing.
///
/// Owns the backend and at most one attached [`MediaHandle`]. Every command
/// takes `&mut self`, so commands on one session never overlap; observers
/// follow along through [`PlaybackSession::subscribe`].
pub struct PlaybackSession {
    cfg: SessionConfig,
    backend: Box<dyn MediaBackend>,
    probe: Option<Box<dyn SourceProbe>>,
    attached: Option<MediaHandle>,
    state: PlaybackState,
    refresh: RefreshCycle,
    last_error: Option<PlaybackError>,
    publisher: watch::Sender<PlaybackState>,
}

impl PlaybackSession {
    pub fn new(cfg: SessionConfig, backend: Box<dyn MediaBackend>) -> Self {
        let (publisher, _) = watch::channel(PlaybackState::default());
        Self {
            refresh: RefreshCycle::new(cfg.refresh_interval),
            cfg,
            backend,
            probe: None,
            attached: None,
            state: PlaybackState::default(),
            last_error: None,
            publisher,
        }
    }

    pub fn with_probe(mut self, probe: Box<dyn SourceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn attached_handle(&self) -> Option<HandleId> {
        self.attached.as_ref().map(MediaHandle::id)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// When the driver should next call [`PlaybackSession::refresh`]; `None`
    /// while nothing is playing.
    pub fn next_refresh_at(&self) -> Option<Instant> {
        self.refresh.next_at()
    }

    pub async fn prepare(&mut self) {
        if let Err(err) = self.backend.configure(&self.cfg.audio_mode).await {
            warn!(backend = self.backend.name(), error = %err, "failed to configure audio mode");
        }
    }

    pub async fn play(&mut self, track: Track) {
        info!(track = %track.id, title = %track.title, "play requested");
        self.release().await;

        self.last_error = None;
        self.state.active_track = None;
        self.state.position_ms = 0;
        self.state.duration_ms = 0;
        self.state.is_mini_player_dismissed = false;
        self.state.is_full_player_open = false;
        self.state.set_phase(PlaybackPhase::Loading);
        self.publish();

        match self.attach(&track).await {
            Ok(handle) => {
                info!(track = %track.id, handle = %handle.id(), "playback started");
                self.attached = Some(handle);
                self.state.duration_ms = track.duration_hint_ms.unwrap_or(0);
                self.state.active_track = Some(track);
                self.state.set_phase(PlaybackPhase::Playing);
                self.refresh.start(Instant::now());
                self.sync_status().await;
            }
            Err(err) => {
                error!(track = %track.id, error = %err, "{}", err.user_message());
                self.state.set_phase(PlaybackPhase::Idle);
                self.last_error = Some(err);
            }
        }
        self.publish();
    }

    pub async fn pause(&mut self) {
        if self.state.phase != PlaybackPhase::Playing {
            debug!("pause ignored; nothing is playing");
            return;
        }
        if let Some(handle) = &self.attached {
            let result = self.backend.pause(handle).await;
            if let Err(err) = result {
                self.backend_failed("pause", err);
                return;
            }
        }
        self.refresh.halt();
        self.state.set_phase(PlaybackPhase::Paused);
        self.publish();
    }

    pub async fn resume(&mut self) {
        if self.state.active_track.is_none() {
            debug!("resume ignored; no active track");
            return;
        }
        if matches!(self.state.phase, PlaybackPhase::Playing | PlaybackPhase::Loading) {
            return;
        }
        let replay = self.state.phase == PlaybackPhase::Finished;
        if let Some(handle) = &self.attached {
            let result = if replay {
                self.backend.play(handle).await
            } else {
                self.backend.resume(handle).await
            };
            if let Err(err) = result {
                self.backend_failed(if replay { "play" } else { "resume" }, err);
                return;
            }
        }
        if replay {
            self.state.position_ms = 0;
        }
        self.state.set_phase(PlaybackPhase::Playing);
        self.refresh.start(Instant::now());
        self.publish();
    }

    pub async fn stop(&mut self) {
        self.release().await;
        self.state.active_track = None;
        self.state.position_ms = 0;
        self.state.duration_ms = 0;
        self.state.set_phase(PlaybackPhase::Idle);
        self.publish();
    }

    /// Seeks to `target_ms`, clamped to the known duration.
    pub async fn seek(&mut self, target_ms: i64) {
        if self.state.active_track.is_none() {
            debug!("seek ignored; no active track");
            return;
        }
        let max = i64::try_from(self.state.duration_ms).unwrap_or(i64::MAX);
        let target = target_ms.clamp(0, max) as u64;
        if let Some(handle) = &self.attached {
            let result = self.backend.seek(handle, target).await;
            if let Err(err) = result {
                self.backend_failed("seek", err);
                return;
            }
        }
        self.state.position_ms = target;
        if self.state.phase == PlaybackPhase::Finished {
            self.state.set_phase(PlaybackPhase::Paused);
        }
        self.publish();
    }

    /// Play-button behaviour: the active track toggles between playing and
    /// paused, anything else starts playing.
    pub async fn toggle(&mut self, track: Track) {
        if self.state.active_id() == Some(track.id.as_str()) {
            if self.state.is_playing {
                self.pause().await;
            } else {
                self.resume().await;
            }
        } else {
            self.play(track).await;
        }
    }

    pub fn open_full_player(&mut self) {
        self.state.is_full_player_open = true;
        self.publish();
    }

    pub fn close_full_player(&mut self) {
        self.state.is_full_player_open = false;
        self.publish();
    }

    pub fn dismiss_mini_player(&mut self) {
        self.state.is_mini_player_dismissed = true;
        self.publish();
    }

    /// One position-refresh tick.
    pub async fn refresh(&mut self) {
        if self.state.phase != PlaybackPhase::Playing {
            self.refresh.halt();
            return;
        }
        self.refresh.advance(Instant::now());
        self.sync_status().await;
        self.publish();
    }

    /// End-of-media notification from the backend. Notifications for a
    /// handle that has since been released are dropped.
    pub fn on_media_finished(&mut self, handle: HandleId) {
        if self.attached_handle() != Some(handle) {
            debug!(%handle, "ignoring end of media for released handle");
            return;
        }
        if self.state.phase != PlaybackPhase::Playing {
            return;
        }
        self.finish();
        self.publish();
    }

    pub async fn shutdown(&mut self) {
        if self.attached.is_some() {
            info!("releasing media before shutdown");
        }
        self.stop().await;
    }

    async fn attach(&mut self, track: &Track) -> Result<MediaHandle, PlaybackError> {
        let url = parse_source(&track.source_url)?;

        if let Some(probe) = &self.probe {
            if is_remote(&url) {
                if let Err(err) = probe.check(&url).await {
                    warn!(%url, error = %err, "could not verify audio source; opening anyway");
                    self.last_error = Some(err.into());
                }
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(%url, attempt, "opening audio");
            let opened = tokio::time::timeout(
                self.cfg.open_timeout,
                self.backend.open(&url),
            )
            .await;
            let failure = match opened {
                Ok(Ok(handle)) => return Ok(handle),
                Ok(Err(err)) => PlaybackError::OpenFailed {
                    reason: format!("{err:#}"),
                },
                Err(_) => PlaybackError::OpenTimedOut {
                    after: self.cfg.open_timeout,
                },
            };
            if attempt > self.cfg.open_retries {
                return Err(failure);
            }
            warn!(%url, attempt, error = %failure, "open failed; retrying");
        }
    }

    /// Stops and unloads the attached handle, if any. The handle is dropped
    /// from the session even when the backend reports an error.
    async fn release(&mut self) {
        self.refresh.halt();
        if let Some(handle) = self.attached.take() {
            debug!(handle = %handle.id(), url = %handle.url(), "releasing media");
            if let Err(err) = self.backend.stop(&handle).await {
                warn!(handle = %handle.id(), error = %err, "failed to stop media before unload");
            }
            if let Err(err) = self.backend.unload(handle).await {
                warn!(error = %err, "failed to unload media");
            }
        }
    }

    async fn sync_status(&mut self) {
        let Some(handle) = &self.attached else {
            return;
        };
        let result = self.backend.status(handle).await;
        match result {
            Ok(status) => self.apply_status(status),
            Err(err) => warn!(error = %err, "failed to read playback status"),
        }
    }

    fn apply_status(&mut self, status: MediaStatus) {
        if status.finished {
            self.finish();
            return;
        }
        if !status.is_loaded {
            return;
        }
        if status.duration_ms > 0 {
            self.state.duration_ms = status.duration_ms;
        }
        self.state.position_ms = if self.state.duration_ms > 0 {
            status.position_ms.min(self.state.duration_ms)
        } else {
            status.position_ms
        };
    }

    fn finish(&mut self) {
        info!(track = ?self.state.active_id(), "track finished");
        self.refresh.halt();
        self.state.position_ms = 0;
        self.state.set_phase(PlaybackPhase::Finished);
    }

    fn backend_failed(&mut self, op: &'static str, err: anyhow::Error) {
        warn!(op, error = %err, "backend command failed; state unchanged");
        self.last_error = Some(PlaybackError::Backend {
            op,
            reason: format!("{err:#}"),
        });
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaybackSession, SessionConfig};
    use crate::error::{PlaybackError, ProbeError};
    use crate::probe::SourceProbe;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use castdeck_backends::{HandleId, MediaBackend, MediaHandle, MediaStatus, SimulatedBackend};
    use castdeck_core::{AudioMode, PlaybackPhase, PlaybackState, Track, TrackKind};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::watch;
    use url::Url;

    #[derive(Default)]
    struct Script {
        next_id: u64,
        attached: Vec<HandleId>,
        calls: Vec<String>,
        open_failures: u32,
        hang_opens: u32,
        fail_commands: bool,
        status: MediaStatus,
        observer: Option<watch::Receiver<PlaybackState>>,
        loading_seen: Vec<bool>,
        audio_mode: Option<AudioMode>,
    }

    struct ScriptedBackend {
        script: Arc<Mutex<Script>>,
    }

    impl ScriptedBackend {
        fn command(&self, call: String) -> Result<()> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(call);
            if script.fail_commands {
                bail!("device busy");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MediaBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn configure(&mut self, mode: &AudioMode) -> Result<()> {
            self.script.lock().unwrap().audio_mode = Some(*mode);
            Ok(())
        }

        async fn open(&mut self, url: &Url) -> Result<MediaHandle> {
            let hang = {
                let mut script = self.script.lock().unwrap();
                script.calls.push(format!("open {url}"));
                let loading = script.observer.as_ref().map(|rx| rx.borrow().is_loading);
                if let Some(loading) = loading {
                    script.loading_seen.push(loading);
                }
                if script.hang_opens > 0 {
                    script.hang_opens -= 1;
                    true
                } else {
                    false
                }
            };
            if hang {
                std::future::pending::<()>().await;
            }

            let mut script = self.script.lock().unwrap();
            if script.open_failures > 0 {
                script.open_failures -= 1;
                bail!("network connection lost");
            }
            script.next_id += 1;
            let id = HandleId(script.next_id);
            script.attached.push(id);
            Ok(MediaHandle::new(id, url.clone()))
        }

        async fn play(&mut self, handle: &MediaHandle) -> Result<()> {
            self.command(format!("play {}", handle.id()))
        }

        async fn pause(&mut self, handle: &MediaHandle) -> Result<()> {
            self.command(format!("pause {}", handle.id()))
        }

        async fn resume(&mut self, handle: &MediaHandle) -> Result<()> {
            self.command(format!("resume {}", handle.id()))
        }

        async fn stop(&mut self, handle: &MediaHandle) -> Result<()> {
            self.command(format!("stop {}", handle.id()))
        }

        async fn seek(&mut self, handle: &MediaHandle, position_ms: u64) -> Result<()> {
            self.command(format!("seek {} {position_ms}", handle.id()))
        }

        async fn status(&mut self, handle: &MediaHandle) -> Result<MediaStatus> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(format!("status {}", handle.id()));
            Ok(script.status)
        }

        async fn unload(&mut self, handle: MediaHandle) -> Result<()> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(format!("unload {}", handle.id()));
            script.attached.retain(|id| *id != handle.id());
            Ok(())
        }
    }

    struct DenyingProbe;

    #[async_trait]
    impl SourceProbe for DenyingProbe {
        async fn check(&self, _url: &Url) -> Result<(), ProbeError> {
            Err(ProbeError::Forbidden)
        }
    }

    fn loaded(position_ms: u64, duration_ms: u64) -> MediaStatus {
        MediaStatus {
            position_ms,
            duration_ms,
            is_loaded: true,
            finished: false,
        }
    }

    fn session() -> (PlaybackSession, Arc<Mutex<Script>>) {
        let script = Arc::new(Mutex::new(Script {
            status: loaded(0, 180_000),
            ..Script::default()
        }));
        let backend = ScriptedBackend {
            script: script.clone(),
        };
        let session = PlaybackSession::new(SessionConfig::default(), Box::new(backend));
        script.lock().unwrap().observer = Some(session.subscribe());
        (session, script)
    }

    fn track(id: &str) -> Track {
        Track::new(
            id,
            format!("Track {id}"),
            format!("https://example.com/{id}.mp3"),
            TrackKind::Podcast,
        )
    }

    fn calls(script: &Arc<Mutex<Script>>) -> Vec<String> {
        script.lock().unwrap().calls.clone()
    }

    #[tokio::test]
    async fn play_pause_resume_seek_stop_scenario() {
        let (mut session, script) = session();

        session.play(track("1")).await;
        assert_eq!(script.lock().unwrap().loading_seen, vec![true]);
        let state = session.state();
        assert!(state.is_playing);
        assert!(!state.is_loading);
        assert_eq!(state.active_id(), Some("1"));
        assert_eq!(state.duration_ms, 180_000);

        session.pause().await;
        assert!(!session.state().is_playing);
        assert!(session.next_refresh_at().is_none());

        session.resume().await;
        assert!(session.state().is_playing);
        assert!(session.next_refresh_at().is_some());

        session.seek(999_999).await;
        assert_eq!(session.state().position_ms, 180_000);

        session.stop().await;
        assert!(session.state().active_track.is_none());
        assert!(script.lock().unwrap().attached.is_empty());
    }

    #[tokio::test]
    async fn switching_tracks_leaves_one_handle_for_the_newest() {
        let (mut session, script) = session();

        session.play(track("a")).await;
        session.play(track("b")).await;
        assert_eq!(script.lock().unwrap().attached, vec![HandleId(2)]);
        assert_eq!(session.attached_handle(), Some(HandleId(2)));
        assert_eq!(session.state().active_id(), Some("b"));

        session.play(track("b")).await;
        assert_eq!(script.lock().unwrap().attached, vec![HandleId(3)]);

        let log = calls(&script);
        let stop = log.iter().position(|c| c == "stop #2").unwrap();
        let unload = log.iter().position(|c| c == "unload #2").unwrap();
        let reopen = log.iter().rposition(|c| c.starts_with("open ")).unwrap();
        assert!(stop < unload && unload < reopen);
    }

    #[tokio::test]
    async fn stop_resets_everything_from_any_state() {
        let (mut session, script) = session();
        session.stop().await;
        assert_eq!(session.state().phase, PlaybackPhase::Idle);

        session.play(track("1")).await;
        session.seek(30_000).await;
        session.pause().await;
        session.stop().await;

        let state = session.state();
        assert!(state.active_track.is_none());
        assert!(!state.is_playing);
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.duration_ms, 0);
        assert!(script.lock().unwrap().attached.is_empty());
    }

    #[tokio::test]
    async fn seek_clamps_into_known_duration() {
        let (mut session, script) = session();
        session.play(track("1")).await;

        session.seek(-5_000).await;
        assert_eq!(session.state().position_ms, 0);

        session.seek(42_000).await;
        assert_eq!(session.state().position_ms, 42_000);
        assert!(calls(&script).contains(&"seek #1 42000".to_string()));

        session.seek(i64::MAX).await;
        assert_eq!(session.state().position_ms, 180_000);
    }

    #[tokio::test]
    async fn commands_without_a_track_are_silent_noops() {
        let (mut session, script) = session();

        session.pause().await;
        session.resume().await;
        session.seek(10_000).await;

        assert!(session.state().active_track.is_none());
        assert!(!session.state().is_playing);
        assert!(session.last_error().is_none());
        assert!(calls(&script).is_empty());
    }

    #[tokio::test]
    async fn new_track_clears_ui_flags() {
        let (mut session, _script) = session();
        session.play(track("1")).await;
        session.dismiss_mini_player();
        session.open_full_player();
        assert!(!session.state().mini_player_visible());

        session.play(track("2")).await;
        assert!(!session.state().is_mini_player_dismissed);
        assert!(!session.state().is_full_player_open);
        assert!(session.state().mini_player_visible());
    }

    #[tokio::test]
    async fn natural_end_keeps_the_track() {
        let (mut session, script) = session();
        session.play(track("1")).await;
        session.seek(90_000).await;

        script.lock().unwrap().status = MediaStatus {
            finished: true,
            ..loaded(180_000, 180_000)
        };
        session.refresh().await;

        let state = session.state();
        assert!(!state.is_playing);
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.phase, PlaybackPhase::Finished);
        assert_eq!(state.active_id(), Some("1"));
        assert!(session.next_refresh_at().is_none());

        script.lock().unwrap().status = loaded(0, 180_000);
        session.resume().await;
        assert!(session.state().is_playing);
        assert!(calls(&script).contains(&"play #1".to_string()));
    }

    #[tokio::test]
    async fn resume_after_pause_continues_rather_than_replaying() {
        let (mut session, script) = session();
        session.play(track("1")).await;
        session.pause().await;
        session.resume().await;

        let log = calls(&script);
        assert!(log.contains(&"resume #1".to_string()));
        assert!(!log.contains(&"play #1".to_string()));
    }

    #[tokio::test]
    async fn end_of_media_for_a_released_handle_is_ignored() {
        let (mut session, _script) = session();
        session.play(track("a")).await;
        let first = session.attached_handle().unwrap();
        session.play(track("b")).await;

        session.on_media_finished(first);
        assert!(session.state().is_playing);

        let current = session.attached_handle().unwrap();
        session.on_media_finished(current);
        assert_eq!(session.state().phase, PlaybackPhase::Finished);
        assert_eq!(session.state().active_id(), Some("b"));
    }

    #[tokio::test]
    async fn failed_open_leaves_no_active_track() {
        let (mut session, script) = session();
        session.play(track("a")).await;
        script.lock().unwrap().open_failures = 2;

        session.play(track("b")).await;

        let state = session.state();
        assert!(state.active_track.is_none());
        assert!(!state.is_playing);
        assert!(!state.is_loading);
        assert!(session.attached_handle().is_none());
        assert!(script.lock().unwrap().attached.is_empty());
        assert!(matches!(
            session.last_error(),
            Some(PlaybackError::OpenFailed { .. })
        ));
        assert!(session
            .last_error()
            .unwrap()
            .user_message()
            .starts_with("Network error"));
    }

    #[tokio::test]
    async fn a_single_failed_open_is_retried() {
        let (mut session, script) = session();
        script.lock().unwrap().open_failures = 1;

        session.play(track("a")).await;

        assert!(session.state().is_playing);
        let opens = calls(&script)
            .iter()
            .filter(|c| c.starts_with("open "))
            .count();
        assert_eq!(opens, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_open_times_out_and_retries_once() {
        let (mut session, script) = session();
        script.lock().unwrap().hang_opens = 1;
        session.play(track("a")).await;
        assert!(session.state().is_playing);

        script.lock().unwrap().hang_opens = 2;
        session.play(track("b")).await;
        assert!(session.state().active_track.is_none());
        assert!(matches!(
            session.last_error(),
            Some(PlaybackError::OpenTimedOut { .. })
        ));
        assert!(script.lock().unwrap().attached.is_empty());
    }

    #[tokio::test]
    async fn failed_probe_does_not_block_playback() {
        let (session, _script) = session();
        let mut session = session.with_probe(Box::new(DenyingProbe));

        session.play(track("1")).await;

        assert!(session.state().is_playing);
        assert!(matches!(
            session.last_error(),
            Some(PlaybackError::ResourceUnreachable(ProbeError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn invalid_source_never_reaches_the_backend() {
        let (mut session, script) = session();
        session
            .play(Track::new("x", "No audio", "  ", TrackKind::Article))
            .await;

        assert!(session.state().active_track.is_none());
        assert!(matches!(
            session.last_error(),
            Some(PlaybackError::InvalidSource(_))
        ));
        assert!(calls(&script).is_empty());
    }

    #[tokio::test]
    async fn backend_failures_leave_state_unchanged() {
        let (mut session, script) = session();
        session.play(track("1")).await;
        script.lock().unwrap().fail_commands = true;

        session.pause().await;
        assert!(session.state().is_playing);
        assert!(matches!(
            session.last_error(),
            Some(PlaybackError::Backend { op: "pause", .. })
        ));

        session.seek(60_000).await;
        assert_eq!(session.state().position_ms, 0);

        session.stop().await;
        assert!(session.state().active_track.is_none());
        assert!(script.lock().unwrap().attached.is_empty());
    }

    #[tokio::test]
    async fn refresh_republishes_backend_position() {
        let (mut session, script) = session();
        let mut rx = session.subscribe();
        session.play(track("1")).await;

        script.lock().unwrap().status = loaded(42_000, 240_000);
        session.refresh().await;

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.position_ms, 42_000);
        assert_eq!(seen.duration_ms, 240_000);

        session.pause().await;
        script.lock().unwrap().status = loaded(50_000, 240_000);
        session.refresh().await;
        assert_eq!(session.state().position_ms, 42_000);
    }

    #[tokio::test]
    async fn refresh_never_reports_position_past_duration() {
        let (mut session, script) = session();
        session.play(track("1")).await;

        script.lock().unwrap().status = loaded(250_000, 180_000);
        session.refresh().await;

        assert_eq!(session.state().position_ms, 180_000);
        assert_eq!(session.state().duration_ms, 180_000);
    }

    #[tokio::test]
    async fn backend_duration_replaces_the_hint() {
        let (mut session, script) = session();
        script.lock().unwrap().status = MediaStatus {
            is_loaded: false,
            ..MediaStatus::default()
        };
        session.play(track("1").with_duration_hint_ms(600_000)).await;
        assert_eq!(session.state().duration_ms, 600_000);

        script.lock().unwrap().status = loaded(5_000, 612_345);
        session.refresh().await;
        assert_eq!(session.state().duration_ms, 612_345);
        assert_eq!(session.state().position_ms, 5_000);
    }

    #[tokio::test]
    async fn seeking_with_an_enormous_duration_does_not_overflow() {
        let (mut session, script) = session();
        script.lock().unwrap().status = MediaStatus {
            is_loaded: false,
            ..MediaStatus::default()
        };
        session.play(track("1").with_duration_hint_ms(u64::MAX)).await;

        session.seek(1_000).await;
        assert_eq!(session.state().position_ms, 1_000);

        session.seek(i64::MAX).await;
        assert_eq!(session.state().position_ms, i64::MAX as u64);
    }

    #[tokio::test]
    async fn prepare_hands_the_audio_mode_to_the_backend() {
        let script = Arc::new(Mutex::new(Script::default()));
        let backend = ScriptedBackend {
            script: script.clone(),
        };
        let mode = AudioMode {
            stays_active_in_background: false,
            plays_in_silent_mode: true,
            duck_others: true,
        };
        let cfg = SessionConfig {
            audio_mode: mode,
            ..SessionConfig::default()
        };
        let mut session = PlaybackSession::new(cfg, Box::new(backend));

        session.prepare().await;

        assert_eq!(script.lock().unwrap().audio_mode, Some(mode));
    }

    #[tokio::test]
    async fn toggle_pauses_resumes_or_switches() {
        let (mut session, _script) = session();

        session.toggle(track("1")).await;
        assert!(session.state().is_playing);

        session.toggle(track("1")).await;
        assert_eq!(session.state().phase, PlaybackPhase::Paused);

        session.toggle(track("1")).await;
        assert!(session.state().is_playing);

        session.toggle(track("2")).await;
        assert_eq!(session.state().active_id(), Some("2"));
        assert!(session.state().is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_backend_drives_position_and_completion() {
        let mut session = PlaybackSession::new(
            SessionConfig::default(),
            Box::new(SimulatedBackend::new(10_000)),
        );
        session.prepare().await;
        session.play(track("1")).await;
        assert_eq!(session.state().duration_ms, 10_000);

        tokio::time::advance(Duration::from_secs(3)).await;
        session.refresh().await;
        assert_eq!(session.state().position_ms, 3_000);

        tokio::time::advance(Duration::from_secs(8)).await;
        session.refresh().await;
        assert_eq!(session.state().phase, PlaybackPhase::Finished);
        assert_eq!(session.state().position_ms, 0);
        assert_eq!(session.state().active_id(), Some("1"));
    }
}
