mod keys;
mod renderer;

use crate::renderer::{TerminalGuard, TerminalRenderer};
use clap::Parser;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use karaoke_core::{
    format_time, resolve_audio_file, shared, AudioSettings, CoreError, KaraokeConfig,
    LyricsLoader, NullAudioDriver, PlaybackController, Song, SyncEvent, SyncLoop, SyncOutcome,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Set while the lyric display owns the terminal; console logging drops
/// below `warn` so it does not draw over the screen.
static CONSOLE_QUIET: AtomicBool = AtomicBool::new(false);

/// Word-by-word synchronized lyrics in the terminal
#[derive(Parser, Debug)]
#[command(name = "karaoke", version, about)]
struct Args {
    /// Song to play (lyrics file name, with or without .json)
    #[arg(value_name = "SONG", required_unless_present = "list")]
    song: Option<String>,

    /// Config file to use instead of ~/.config/karaoke/config.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory containing lyrics files
    #[arg(short, long, value_name = "DIR")]
    lyrics_dir: Option<PathBuf>,

    /// Audio file to play along (enables audio)
    #[arg(short, long, value_name = "FILE")]
    audio: Option<PathBuf>,

    /// Start playback at this position in milliseconds
    #[arg(short, long, value_name = "MS", default_value_t = 0)]
    start_ms: u64,

    /// List available songs and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    let args = Args::parse();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(KaraokeConfig::config_path);

    init_tracing(check_file_logging_enabled(&config_path));

    // An explicit --config must exist; the default location is created on first run
    let loaded = if args.config.is_some() {
        KaraokeConfig::load_from(&config_path)
    } else {
        KaraokeConfig::load_or_create_at(&config_path)
    };
    let config = match loaded {
        Ok(config) => config,
        Err(CoreError::ConfigParseError(parse_error)) => {
            eprintln!(
                "Failed to parse config file {}:\n{parse_error}",
                config_path.display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let lyrics_dir = args
        .lyrics_dir
        .clone()
        .unwrap_or_else(|| config.lyrics.directory.clone());
    let loader = LyricsLoader::new(lyrics_dir);

    if args.list {
        std::process::exit(list_songs(&loader, &config.audio.directory));
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run(args, config, loader));
    std::process::exit(code);
}

fn list_songs(loader: &LyricsLoader, audio_dir: &Path) -> i32 {
    let songs = match loader.list_available_songs() {
        Ok(songs) => songs,
        Err(e) => {
            eprintln!("Failed to list {}: {e}", loader.directory().display());
            return 1;
        }
    };

    if songs.is_empty() {
        println!("No songs found in {}", loader.directory().display());
        return 0;
    }

    println!("Available songs in {}:", loader.directory().display());
    for name in songs {
        let has_audio = resolve_audio_file(audio_dir, &name).is_ok();
        match loader.load_song(&name) {
            Ok(song) => println!("  {}", song_listing(&name, &song, has_audio)),
            Err(e) => {
                debug!("Skipping details for {}: {}", name, e);
                match loader.song_info(&name) {
                    Some(info) => println!("  {name:<24} {} - {}", info.title, info.artist),
                    None => println!("  {name:<24} (unreadable)"),
                }
            }
        }
    }
    0
}

/// One `--list` row: name, title, artist, size and length of a song.
fn song_listing(name: &str, song: &Song, has_audio: bool) -> String {
    format!(
        "{name:<24} {} - {}  [{} sentences, {} words, {}]{}",
        song.title,
        song.artist,
        song.sentence_count(),
        song.word_count(),
        format_time(song.total_duration()),
        if has_audio { "  \u{266a}" } else { "" }
    )
}

async fn run(args: Args, config: KaraokeConfig, loader: LyricsLoader) -> i32 {
    let Some(song_name) = args.song.as_deref() else {
        eprintln!("No song given. Use --list to see available songs.");
        return 2;
    };

    let song = match loader.load_song(song_name) {
        Ok(song) => song,
        Err(CoreError::LyricsNotFound { path }) => {
            eprintln!("Lyrics file not found: {}", path.display());
            eprintln!("Use --list to see available songs.");
            return 1;
        }
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };
    let song = if config.lyrics.sort_by_start_time {
        song.sorted_by_start_time()
    } else {
        song
    };
    let song = Arc::new(song);

    let settings = AudioSettings {
        enabled: config.audio.enabled || args.audio.is_some(),
        volume: config.audio.volume,
    };
    let controller = Arc::new(PlaybackController::new(
        shared(NullAudioDriver::default()),
        settings,
    ));
    if settings.enabled {
        load_audio(&controller, args.audio.as_deref(), &config, song_name);
    }

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Ctrl+C before raw mode is enabled (and after it is left)
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let mut guard = match TerminalGuard::enter() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize terminal: {e}");
            return 1;
        }
    };
    CONSOLE_QUIET.store(true, Ordering::Relaxed);

    if let Err(e) = controller.play(Duration::from_millis(args.start_ms)) {
        warn!("{e}");
    }

    let timing = config.timing();
    let sync = SyncLoop::new(
        Arc::clone(&song),
        Arc::clone(&controller),
        timing,
        config.playback.refresh_rate_hz,
        Some(cancel_token.clone()),
    );
    let sync_events = sync.subscribe();
    let renderer = TerminalRenderer::new(config.display, timing.highlight_duration_ms);
    let handle = sync.start(Box::new(renderer));

    let seek_step_ms = i64::try_from(config.playback.seek_step_ms).unwrap_or(i64::MAX);
    drive_session(&controller, sync_events, &cancel_token, seek_step_ms).await;

    let outcome = handle.stop().await;
    guard.restore();
    CONSOLE_QUIET.store(false, Ordering::Relaxed);

    match outcome {
        SyncOutcome::Finished => {
            println!("Finished '{}' by {}", song.title, song.artist);
            0
        }
        SyncOutcome::Cancelled => 0,
        SyncOutcome::Aborted { reason } => {
            eprintln!("Playback aborted: {reason}");
            1
        }
    }
}

fn load_audio(
    controller: &PlaybackController,
    explicit: Option<&Path>,
    config: &KaraokeConfig,
    song_name: &str,
) {
    let stem = song_name.trim_end_matches(".json");
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_audio_file(&config.audio.directory, stem) {
            Ok(path) => path,
            Err(e) => {
                warn!("No audio for '{}': {}; running visual-only", stem, e);
                return;
            }
        },
    };

    if let Err(e) = controller.load_audio(&path) {
        warn!("{e}; running visual-only");
    }
}

/// Forward key presses to the controller until quit, cancellation or the
/// end of the song.
async fn drive_session(
    controller: &PlaybackController,
    mut sync_events: tokio::sync::broadcast::Receiver<SyncEvent>,
    cancel_token: &CancellationToken,
    seek_step_ms: i64,
) {
    let mut input = EventStream::new();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            event = sync_events.recv() => match event {
                Ok(SyncEvent::Started { total_duration }) => {
                    debug!("Sync started, song length {:?}", total_duration);
                }
                Ok(event) => {
                    debug!("Sync event: {:?}", event);
                    break;
                }
                Err(RecvError::Lagged(n)) => debug!("Missed {} sync events", n),
                Err(RecvError::Closed) => break,
            },
            input_event = input.next() => match input_event {
                Some(Ok(Event::Key(key))) => {
                    if let Some(command) = keys::command_for(&key) {
                        if !keys::apply(controller, command, seek_step_ms).await {
                            break;
                        }
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Terminal input failed: {}", e);
                    break;
                }
                None => break,
            },
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

fn console_allows(level: Level, quiet: bool) -> bool {
    !quiet || level <= Level::WARN
}

/// Initialize tracing with stderr output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(|metadata| {
            console_allows(*metadata.level(), CONSOLE_QUIET.load(Ordering::Relaxed))
        }));

    if file_logging_enabled {
        let log_path = karaoke_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
