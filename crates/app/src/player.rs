use anyhow::{bail, Result};
use castdeck_core::{
    format_clock, parse_source, Catalog, PlaybackPhase, PlaybackState, Track, TrackKind,
};
use castdeck_session::PlaybackSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};

const HELP: &str = "commands: play <id|url>, pause, resume, toggle, seek <secs>, stop, full, close, dismiss, status, help, quit";

/// Terminal front end: reads commands from stdin, drives the session's
/// refresh cycle and prints the mini player whenever the state changes.
pub async fn run(
    mut session: PlaybackSession,
    catalog: &Catalog,
    source: Option<String>,
) -> Result<()> {
    let mut view = session.subscribe();
    println!("{HELP}");

    if let Some(source) = source {
        match resolve_track(catalog, &source) {
            Ok(track) => start(&mut session, track).await,
            Err(err) => println!("{err}"),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let refresh_at = session.next_refresh_at();
        tokio::select! {
            _ = sleep_until(refresh_at) => session.refresh().await,
            line = lines.next_line() => {
                let Some(line) = command_line(line) else { break };
                if !handle_command(&mut session, catalog, line.trim()).await {
                    break;
                }
            }
            changed = view.changed() => {
                if changed.is_ok() {
                    let state = view.borrow_and_update().clone();
                    render_mini(&state);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c; shutting down");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// `None` once input is exhausted or unreadable; the loop then shuts down.
fn command_line(read: std::io::Result<Option<String>>) -> Option<String> {
    match read {
        Ok(line) => line,
        Err(err) => {
            warn!(error = %err, "failed to read from stdin");
            None
        }
    }
}

async fn start(session: &mut PlaybackSession, track: Track) {
    session.play(track).await;
    if let Some(notice) = failure_notice(session) {
        println!("{notice}");
    }
}

/// The message to show after a `play` that left nothing loaded.
fn failure_notice(session: &PlaybackSession) -> Option<String> {
    if session.state().active_track.is_some() {
        return None;
    }
    session.last_error().map(|err| format!("[--] {}", err.user_message()))
}

/// Returns `false` when the user asked to quit.
async fn handle_command(session: &mut PlaybackSession, catalog: &Catalog, line: &str) -> bool {
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => {}
        "play" => match resolve_track(catalog, arg) {
            Ok(track) => start(session, track).await,
            Err(err) => println!("{err}"),
        },
        "pause" => session.pause().await,
        "resume" => session.resume().await,
        "toggle" => match session.state().active_track.clone() {
            Some(track) => session.toggle(track).await,
            None => println!("nothing loaded"),
        },
        "seek" => match arg.parse::<f64>() {
            Ok(secs) => session.seek((secs * 1_000.0) as i64).await,
            Err(_) => println!("usage: seek <seconds>"),
        },
        "stop" => session.stop().await,
        "full" => {
            session.open_full_player();
            render_full(session.state());
        }
        "close" => session.close_full_player(),
        "dismiss" => session.dismiss_mini_player(),
        "status" => render_full(session.state()),
        "help" => println!("{HELP}"),
        "quit" | "exit" => return false,
        other => println!("unknown command {other:?}; {HELP}"),
    }
    true
}

/// Resolves a catalog id, falling back to treating the input as an audio
/// source of its own.
pub fn resolve_track(catalog: &Catalog, source: &str) -> Result<Track> {
    if let Some(track) = catalog.track(source) {
        return Ok(track);
    }
    let url = match parse_source(source) {
        Ok(url) => url,
        Err(err) => bail!("{source:?} is neither a catalog id nor a playable source ({err})"),
    };
    let title = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or(source)
        .to_string();
    Ok(Track::new(url.as_str(), title, url.as_str(), TrackKind::Podcast))
}

fn render_mini(state: &PlaybackState) {
    if state.is_loading {
        println!("[..] loading");
        return;
    }
    let Some(track) = &state.active_track else {
        return;
    };
    if !state.mini_player_visible() {
        return;
    }
    let icon = match state.phase {
        PlaybackPhase::Playing => ">>",
        PlaybackPhase::Finished => "==",
        _ => "||",
    };
    println!(
        "[{icon}] {} | {} | {} / {}",
        track.title,
        track.kind.label(),
        format_clock(state.position_ms),
        format_clock(state.duration_ms)
    );
}

fn render_full(state: &PlaybackState) {
    let Some(track) = &state.active_track else {
        println!("nothing playing");
        return;
    };
    const WIDTH: usize = 30;
    let filled = (state.progress_fraction() * WIDTH as f64).round() as usize;

    println!("== Now playing ==");
    println!("{}", track.title);
    if let Some(category) = &track.category {
        println!("{} | {category}", track.kind.label());
    } else {
        println!("{}", track.kind.label());
    }
    println!(
        "{} [{}{}] {}",
        format_clock(state.position_ms),
        "#".repeat(filled),
        "-".repeat(WIDTH - filled.min(WIDTH)),
        format_clock(state.duration_ms)
    );
    println!("state: {:?}", state.phase);
}
