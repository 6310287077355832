use anyhow::Result;
use async_trait::async_trait;
use castdeck_core::{AppConfig, AudioMode, BackendKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub use simulated::SimulatedBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opened, playable resource. Deliberately not `Clone`: whoever holds the
/// handle owns the resource, and `unload` consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaHandle {
    id: HandleId,
    url: Url,
}

impl MediaHandle {
    pub fn new(id: HandleId, url: Url) -> Self {
        Self { id, url }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaStatus {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_loaded: bool,
    /// Set once the resource played to its end without intervention.
    pub finished: bool,
}

/// The platform media subsystem a playback session drives.
#[async_trait]
pub trait MediaBackend: Send {
    fn name(&self) -> &'static str;

    async fn configure(&mut self, _mode: &AudioMode) -> Result<()> {
        Ok(())
    }

    /// Loads `url` and starts playing it from the beginning.
    async fn open(&mut self, url: &Url) -> Result<MediaHandle>;
    /// Plays the resource from the start, used to replay after it finished.
    async fn play(&mut self, handle: &MediaHandle) -> Result<()>;
    async fn pause(&mut self, handle: &MediaHandle) -> Result<()>;
    async fn resume(&mut self, handle: &MediaHandle) -> Result<()>;
    async fn stop(&mut self, handle: &MediaHandle) -> Result<()>;
    async fn seek(&mut self, handle: &MediaHandle, position_ms: u64) -> Result<()>;
    async fn status(&mut self, handle: &MediaHandle) -> Result<MediaStatus>;

    /// Releases the resource. Unloading something already gone is not an error.
    async fn unload(&mut self, handle: MediaHandle) -> Result<()>;
}

/// Picks the playback backend once at startup. `auto` only chooses mpris when
/// a desktop player is actually running.
pub async fn build_backend(cfg: &AppConfig) -> Box<dyn MediaBackend> {
    let simulated = || -> Box<dyn MediaBackend> {
        Box::new(SimulatedBackend::new(cfg.simulated_duration_ms))
    };

    match cfg.backend {
        BackendKind::Simulated => simulated(),
        BackendKind::Mpris => {
            platform::mpris_backend(cfg.mpris_bus_name.clone()).unwrap_or_else(|| {
                tracing::warn!("mpris backend unavailable on this platform; using simulated");
                simulated()
            })
        }
        BackendKind::Auto => match mpris_available(cfg.mpris_bus_name.as_deref()).await {
            Ok(Some(player)) => {
                tracing::info!(%player, "using mpris playback");
                platform::mpris_backend(cfg.mpris_bus_name.clone()).unwrap_or_else(simulated)
            }
            _ => simulated(),
        },
    }
}

/// Reports whether a desktop media player is reachable for the mpris backend.
pub async fn mpris_available(bus_name: Option<&str>) -> Result<Option<String>> {
    platform::mpris_player(bus_name).await
}

mod platform {
    use super::MediaBackend;
    use anyhow::Result;

    #[cfg(target_os = "linux")]
    pub fn mpris_backend(bus_name: Option<String>) -> Option<Box<dyn MediaBackend>> {
        Some(Box::new(crate::mpris::MprisBackend::new(bus_name)))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn mpris_backend(_bus_name: Option<String>) -> Option<Box<dyn MediaBackend>> {
        None
    }

    #[cfg(target_os = "linux")]
    pub async fn mpris_player(bus_name: Option<&str>) -> Result<Option<String>> {
        let conn = zbus::Connection::session().await?;
        crate::mpris::MprisBackend::find_player(&conn, bus_name).await
    }

    #[cfg(not(target_os = "linux"))]
    pub async fn mpris_player(_bus_name: Option<&str>) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(target_os = "linux")]
mod mpris;
mod simulated;
