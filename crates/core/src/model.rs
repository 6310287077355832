use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Article,
    Podcast,
}

impl TrackKind {
    pub fn label(self) -> &'static str {
        match self {
            TrackKind::Article => "Article",
            TrackKind::Podcast => "Podcast",
        }
    }
}

/// A playable unit of content. Built fresh for every play request and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub kind: TrackKind,
    pub cover_image: Option<String>,
    pub duration_hint_ms: Option<u64>,
    pub category: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source_url: impl Into<String>,
        kind: TrackKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_url: source_url.into(),
            kind,
            cover_image: None,
            duration_hint_ms: None,
            category: None,
        }
    }

    pub fn with_cover_image(mut self, cover_image: impl Into<String>) -> Self {
        self.cover_image = Some(cover_image.into());
        self
    }

    pub fn with_duration_hint_ms(mut self, duration_ms: u64) -> Self {
        self.duration_hint_ms = Some(duration_ms);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    /// Reached end of media on its own; the track stays addressable for replay.
    Finished,
}

/// Snapshot published to every observer of a playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub active_track: Option<Track>,
    pub phase: PlaybackPhase,
    pub is_playing: bool,
    pub is_loading: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_full_player_open: bool,
    pub is_mini_player_dismissed: bool,
}

impl PlaybackState {
    /// Moves to `phase` and keeps the derived flags in step with it.
    pub fn set_phase(&mut self, phase: PlaybackPhase) {
        self.phase = phase;
        self.is_playing = phase == PlaybackPhase::Playing;
        self.is_loading = phase == PlaybackPhase::Loading;
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_track.as_ref().map(|t| t.id.as_str())
    }

    pub fn mini_player_visible(&self) -> bool {
        self.active_track.is_some() && !self.is_mini_player_dismissed
    }

    pub fn full_player_visible(&self) -> bool {
        self.active_track.is_some() && self.is_full_player_open
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).min(1.0)
    }
}

/// Formats milliseconds as `m:ss`.
pub fn format_clock(ms: u64) -> String {
    let total_secs = ms / 1_000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
