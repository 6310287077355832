use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("no audio source provided")]
    Empty,
    #[error("invalid audio source {0:?}")]
    Invalid(String),
    #[error("unsupported audio source scheme {0:?}")]
    UnsupportedScheme(String),
}

/// Turns a track's source locator into a URL a backend can open.
pub fn parse_source(raw: &str) -> Result<Url, SourceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SourceError::Empty);
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        return Url::from_file_path(path).map_err(|_| SourceError::Invalid(raw.to_string()));
    }

    let url = Url::parse(raw).map_err(|_| SourceError::Invalid(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" | "file" => Ok(url),
        other => Err(SourceError::UnsupportedScheme(other.to_string())),
    }
}

pub fn is_remote(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
