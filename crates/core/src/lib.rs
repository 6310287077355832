pub mod config;
pub mod content;
pub mod model;
pub mod source;

pub use config::{AppConfig, AudioMode, BackendKind, ConfigIntervals};
pub use content::{Article, Catalog, Podcast, PodcastEpisode};
pub use model::{format_clock, PlaybackPhase, PlaybackState, Track, TrackKind};
pub use source::{is_remote, parse_source, SourceError};
