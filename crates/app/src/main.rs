use anyhow::{Context, Result};
use castdeck_backends::{build_backend, mpris_available};
use castdeck_core::{format_clock, parse_source, AppConfig, Catalog};
use castdeck_probe::HttpProbe;
use castdeck_session::{PlaybackError, PlaybackSession, SessionConfig, SourceProbe};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

mod player;

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

#[derive(Parser, Debug)]
#[command(
    name = "castdeck",
    about = "Play narrated articles and podcast episodes from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the interactive player, optionally playing a catalog id or URL.
    Play { source: Option<String> },
    /// List playable catalog items.
    Catalog,
    /// Check whether an audio source answers.
    Probe { url: String },
    Doctor,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Play { source: None });
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    if let Commands::Config {
        action: ConfigAction::Init,
    } = cmd
    {
        init_config(&cfg_path)?;
        println!("Initialized config at {}", cfg_path.display());
        return Ok(());
    }

    let mut cfg = load_or_default(&cfg_path)?;
    if let Some(path) = cli.catalog {
        cfg.catalog_path = Some(path);
    }
    init_logging(&cfg.log_level);

    match cmd {
        Commands::Play { source } => {
            let catalog = load_catalog(cfg.catalog_path.as_deref())?;
            run(cfg, catalog, source).await
        }
        Commands::Catalog => {
            let catalog = load_catalog(cfg.catalog_path.as_deref())?;
            list_catalog(&catalog);
            Ok(())
        }
        Commands::Probe { url } => probe(&cfg, &url).await,
        Commands::Doctor => doctor(&cfg, &cfg_path).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn run(cfg: AppConfig, catalog: Catalog, source: Option<String>) -> Result<()> {
    let backend = build_backend(&cfg).await;
    let mut session = PlaybackSession::new(SessionConfig::from_app_config(&cfg), backend);
    if cfg.probe_sources {
        match HttpProbe::new(Duration::from_millis(cfg.intervals.probe_timeout_ms)) {
            Ok(probe) => session = session.with_probe(Box::new(probe)),
            Err(err) => warn!(error = %err, "reachability probe disabled"),
        }
    }
    session.prepare().await;

    info!(backend = session.backend_name(), "castdeck player started");
    player::run(session, &catalog, source).await
}

fn list_catalog(catalog: &Catalog) {
    for track in catalog.tracks() {
        let duration = track
            .duration_hint_ms
            .map(format_clock)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<8} {:>6}  {}",
            track.id,
            track.kind.label(),
            duration,
            track.title
        );
    }
}

async fn probe(cfg: &AppConfig, raw: &str) -> Result<()> {
    let url = parse_source(raw)?;
    let probe = HttpProbe::new(Duration::from_millis(cfg.intervals.probe_timeout_ms))
        .context("failed to build http client")?;

    match probe.check(&url).await {
        Ok(()) => println!("{url}: reachable"),
        Err(err) => {
            println!("{url}: {err}");
            println!("{}", PlaybackError::from(err).user_message());
        }
    }
    Ok(())
}

async fn doctor(cfg: &AppConfig, cfg_path: &Path) -> Result<()> {
    println!("== castdeck doctor ==");
    println!(
        "Config: {} ({})",
        cfg_path.display(),
        if cfg_path.exists() { "found" } else { "defaults" }
    );
    println!("Configured backend: {:?}", cfg.backend);
    println!("Selected backend: {}", build_backend(cfg).await.name());

    match mpris_available(cfg.mpris_bus_name.as_deref()).await {
        Ok(Some(player)) => println!("MPRIS player: {player}"),
        Ok(None) => println!("MPRIS player: none running"),
        Err(err) => println!("MPRIS player: unavailable ({err})"),
    }

    match load_catalog(cfg.catalog_path.as_deref()) {
        Ok(catalog) => println!("Catalog: {} playable items", catalog.tracks().len()),
        Err(err) => println!("Catalog: {err:#}"),
    }
    Ok(())
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("castdeck").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("failed to parse catalog {}", path.display()))
        }
        None => serde_json::from_str(BUILTIN_CATALOG).context("built-in catalog is invalid"),
    }
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("CASTDECK_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.log_level = v;
        }
    }
    if let Ok(v) = std::env::var("CASTDECK_BACKEND") {
        if let Ok(kind) = v.parse() {
            cfg.backend = kind;
        }
    }
    if let Ok(v) = std::env::var("CASTDECK_PROBE_SOURCES") {
        if let Ok(parsed) = v.parse::<bool>() {
            cfg.probe_sources = parsed;
        }
    }
}
