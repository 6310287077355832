use crate::{HandleId, MediaBackend, MediaHandle, MediaStatus};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use castdeck_core::AudioMode;
use std::collections::HashMap;
use tracing::debug;
use url::Url;
use zbus::{Connection, Proxy};
use zvariant::{ObjectPath, OwnedValue, Value};

const PLAYER_PREFIX: &str = "org.mpris.MediaPlayer2.";
const PLAYER_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_IFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Drives a desktop media player over the MPRIS D-Bus interface. The player
/// only holds one resource, so only the most recently opened handle is live.
pub struct MprisBackend {
    bus_name: Option<String>,
    proxy: Option<Proxy<'static>>,
    current: Option<HandleId>,
    next_id: u64,
    seen_playing: bool,
    finished: bool,
}

impl MprisBackend {
    pub fn new(bus_name: Option<String>) -> Self {
        Self {
            bus_name,
            proxy: None,
            current: None,
            next_id: 1,
            seen_playing: false,
            finished: false,
        }
    }

    pub(crate) async fn find_player(
        conn: &Connection,
        preferred: Option<&str>,
    ) -> Result<Option<String>> {
        let proxy = Proxy::new(
            conn,
            "org.freedesktop.DBus",
            "/org/freedesktop/DBus",
            "org.freedesktop.DBus",
        )
        .await?;

        let names: Vec<String> = proxy.call("ListNames", &()).await?;
        let mut players: Vec<String> = names
            .into_iter()
            .filter(|n| n.starts_with(PLAYER_PREFIX))
            .collect();
        if let Some(preferred) = preferred {
            return Ok(players.into_iter().find(|n| n == preferred));
        }
        players.sort();
        Ok(players.into_iter().next())
    }

    async fn player(&mut self) -> Result<Proxy<'static>> {
        if let Some(proxy) = &self.proxy {
            return Ok(proxy.clone());
        }

        let conn = Connection::session()
            .await
            .context("failed to connect DBus session")?;
        let player = Self::find_player(&conn, self.bus_name.as_deref())
            .await?
            .ok_or_else(|| anyhow!("no MPRIS media player is running"))?;
        debug!(%player, "attached to mpris player");

        let proxy = Proxy::new_owned(conn, player, PLAYER_PATH, PLAYER_IFACE).await?;
        self.proxy = Some(proxy.clone());
        Ok(proxy)
    }

    fn ensure_current(&self, handle: &MediaHandle) -> Result<()> {
        if self.current != Some(handle.id()) {
            bail!("media {} is no longer loaded", handle.id());
        }
        Ok(())
    }

    async fn command(&mut self, handle: &MediaHandle, method: &str) -> Result<()> {
        self.ensure_current(handle)?;
        let proxy = self.player().await?;
        proxy
            .call_method(method, &())
            .await
            .with_context(|| format!("mpris {method} failed"))?;
        Ok(())
    }

    fn ov_to_u64(v: &OwnedValue) -> Option<u64> {
        if let Ok(i) = <i64>::try_from(v) {
            return u64::try_from(i).ok();
        }
        <u64>::try_from(v).ok()
    }

    fn track_id(metadata: &HashMap<String, OwnedValue>) -> Option<ObjectPath<'static>> {
        match &**metadata.get("mpris:trackid")? {
            Value::ObjectPath(path) => Some(path.clone().into_owned()),
            Value::Str(s) => ObjectPath::try_from(s.to_string()).ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl MediaBackend for MprisBackend {
    fn name(&self) -> &'static str {
        "mpris"
    }

    async fn configure(&mut self, mode: &AudioMode) -> Result<()> {
        // The desktop player owns its audio session.
        debug!(?mode, "mpris backend ignores audio mode");
        Ok(())
    }

    async fn open(&mut self, url: &Url) -> Result<MediaHandle> {
        let proxy = self.player().await?;
        proxy
            .call_method("OpenUri", &url.as_str())
            .await
            .with_context(|| format!("player refused to open {url}"))?;

        let id = HandleId(self.next_id);
        self.next_id += 1;
        self.current = Some(id);
        self.seen_playing = false;
        self.finished = false;
        Ok(MediaHandle::new(id, url.clone()))
    }

    async fn play(&mut self, handle: &MediaHandle) -> Result<()> {
        self.ensure_current(handle)?;
        let proxy = self.player().await?;
        proxy
            .call_method("OpenUri", &handle.url().as_str())
            .await
            .with_context(|| format!("player refused to reopen {}", handle.url()))?;
        self.seen_playing = false;
        self.finished = false;
        Ok(())
    }

    async fn pause(&mut self, handle: &MediaHandle) -> Result<()> {
        self.command(handle, "Pause").await
    }

    async fn resume(&mut self, handle: &MediaHandle) -> Result<()> {
        self.command(handle, "Play").await?;
        self.finished = false;
        Ok(())
    }

    async fn stop(&mut self, handle: &MediaHandle) -> Result<()> {
        self.command(handle, "Stop").await?;
        self.seen_playing = false;
        Ok(())
    }

    async fn seek(&mut self, handle: &MediaHandle, position_ms: u64) -> Result<()> {
        self.ensure_current(handle)?;
        let proxy = self.player().await?;
        let target_us = position_us(position_ms);

        let metadata: HashMap<String, OwnedValue> = proxy.get_property("Metadata").await?;
        if let Some(track_id) = Self::track_id(&metadata) {
            proxy
                .call_method("SetPosition", &(track_id, target_us))
                .await
                .context("mpris SetPosition failed")?;
        } else {
            let current_us: i64 = proxy.get_property("Position").await.unwrap_or(0);
            proxy
                .call_method("Seek", &(target_us - current_us))
                .await
                .context("mpris Seek failed")?;
        }
        Ok(())
    }

    async fn status(&mut self, handle: &MediaHandle) -> Result<MediaStatus> {
        self.ensure_current(handle)?;
        let proxy = self.player().await?;

        let playback: String = proxy.get_property("PlaybackStatus").await?;
        match playback.as_str() {
            "Playing" => self.seen_playing = true,
            "Stopped" if self.seen_playing => {
                self.seen_playing = false;
                self.finished = true;
            }
            _ => {}
        }

        let metadata: HashMap<String, OwnedValue> =
            proxy.get_property("Metadata").await.unwrap_or_default();
        let duration_ms = metadata
            .get("mpris:length")
            .and_then(Self::ov_to_u64)
            .map(|us| us / 1_000)
            .unwrap_or(0);
        let position_us: i64 = proxy.get_property("Position").await.unwrap_or(0);

        let position_ms = if self.finished {
            0
        } else {
            (position_us.max(0) as u64) / 1_000
        };

        Ok(MediaStatus {
            position_ms,
            duration_ms,
            is_loaded: playback != "Stopped" || self.finished,
            finished: self.finished,
        })
    }

    async fn unload(&mut self, handle: MediaHandle) -> Result<()> {
        if self.current != Some(handle.id()) {
            return Ok(());
        }
        self.current = None;
        self.seen_playing = false;
        self.finished = false;
        if let Some(proxy) = &self.proxy {
            proxy
                .call_method("Stop", &())
                .await
                .context("mpris Stop failed")?;
        }
        Ok(())
    }
}

fn position_us(position_ms: u64) -> i64 {
    i64::try_from(position_ms.saturating_mul(1_000)).unwrap_or(i64::MAX)
}
