use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Auto,
    Simulated,
    Mpris,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "simulated" => Ok(BackendKind::Simulated),
            "mpris" => Ok(BackendKind::Mpris),
            other => Err(format!("unknown backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigIntervals {
    pub position_refresh_ms: u64,
    pub open_timeout_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            position_refresh_ms: 1_000,
            open_timeout_ms: 15_000,
            probe_timeout_ms: 5_000,
        }
    }
}

/// Platform audio session settings applied once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioMode {
    pub stays_active_in_background: bool,
    pub plays_in_silent_mode: bool,
    pub duck_others: bool,
}

impl Default for AudioMode {
    fn default() -> Self {
        Self {
            stays_active_in_background: true,
            plays_in_silent_mode: true,
            duck_others: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub backend: BackendKind,
    pub mpris_bus_name: Option<String>,
    pub intervals: ConfigIntervals,
    pub open_retries: u32,
    pub probe_sources: bool,
    pub simulated_duration_ms: u64,
    pub audio: AudioMode,
    pub log_level: String,
    pub catalog_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backend: BackendKind::Auto,
            mpris_bus_name: None,
            intervals: ConfigIntervals::default(),
            open_retries: 1,
            probe_sources: true,
            simulated_duration_ms: 180_000,
            audio: AudioMode::default(),
            log_level: "info".to_string(),
            catalog_path: None,
        }
    }
}
