use castdeck_core::SourceError;
use std::time::Duration;
use thiserror::Error;

/// Why a reachability probe considered a source unreachable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("access denied to audio file (403)")]
    Forbidden,
    #[error("audio file not found (404)")]
    NotFound,
    #[error("audio file not accessible ({0})")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("resource unreachable: {0}")]
    ResourceUnreachable(#[from] ProbeError),
    #[error(transparent)]
    InvalidSource(#[from] SourceError),
    #[error("failed to open audio: {reason}")]
    OpenFailed { reason: String },
    #[error("opening audio timed out after {after:?}")]
    OpenTimedOut { after: Duration },
    #[error("backend {op} failed: {reason}")]
    Backend { op: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AccessDenied,
    NotFound,
    UnsupportedFormat,
    Network,
    Other,
}

impl PlaybackError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PlaybackError::ResourceUnreachable(ProbeError::Forbidden) => FailureKind::AccessDenied,
            PlaybackError::ResourceUnreachable(ProbeError::NotFound) => FailureKind::NotFound,
            PlaybackError::ResourceUnreachable(ProbeError::Network(_))
            | PlaybackError::OpenTimedOut { .. } => FailureKind::Network,
            PlaybackError::InvalidSource(_) => FailureKind::Other,
            other => classify_message(&other.to_string()),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            FailureKind::AccessDenied => {
                "Access denied: the audio source has restricted access. Please try a different track."
            }
            FailureKind::NotFound => {
                "Audio file not found. This track may no longer be available."
            }
            FailureKind::UnsupportedFormat => {
                "Audio format not supported. Please try a different track."
            }
            FailureKind::Network => {
                "Network error. Please check your internet connection and try again."
            }
            FailureKind::Other => "Audio playback failed. Please try a different track.",
        }
    }
}

fn classify_message(message: &str) -> FailureKind {
    let message = message.to_ascii_lowercase();
    if message.contains("403") || message.contains("access denied") {
        FailureKind::AccessDenied
    } else if message.contains("404") || message.contains("not found") {
        FailureKind::NotFound
    } else if message.contains("extractor")
        || message.contains("format")
        || message.contains("unsupported")
    {
        FailureKind::UnsupportedFormat
    } else if message.contains("network")
        || message.contains("connection")
        || message.contains("timed out")
    {
        FailureKind::Network
    } else {
        FailureKind::Other
    }
}
