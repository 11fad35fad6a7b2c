//! soundstage - headless game-audio host
//!
//! Loads the event content pack, drives a player controller through a fixed
//! step loop and routes footsteps and scene music through the audio manager.

mod config;
mod event_log;
mod game;
mod headless;
mod player;
mod scene;
mod scripted_input;

use anyhow::{Context, Result};
use clap::Parser;
use config::HostConfig;
use event_log::JsonlSink;
use game::Game;
use headless::HeadlessConfig;
use scripted_input::ScriptedInputPlayer;
use soundstage_audio::{AudioEngine, AudioManager, EventLibrary, SimEngine};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless host for the soundstage audio layer", long_about = None)]
struct Cli {
    /// Host configuration (TOML)
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Audio event content pack (JSON)
    #[arg(long, default_value = "content/events.json")]
    events: PathBuf,
    /// Number of fixed steps to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Fixed steps per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,
    /// Scripted input driving the player (JSON)
    #[arg(long)]
    script: Option<PathBuf>,
    /// Scene loaded before the first tick
    #[arg(long)]
    scene: Option<String>,
    /// Write audio events as JSONL to this path
    #[arg(long)]
    event_log: Option<PathBuf>,
    /// Use the silent in-memory engine even when real output is available
    #[arg(long)]
    no_audio: bool,
    /// Stop once the script has played through
    #[arg(long)]
    exit_when_script_finished: bool,
    /// Write the effective configuration back to --config
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting soundstage v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = HostConfig::load_from_path(&cli.config);
    if cli.save_config {
        config
            .save_to_path(&cli.config)
            .with_context(|| format!("failed to save {}", cli.config.display()))?;
    }
    let library = EventLibrary::from_path(&cli.events)
        .with_context(|| format!("failed to load content pack {}", cli.events.display()))?;
    info!(events = library.len(), "Loaded content pack");

    let engine = build_engine(&library, cli.no_audio);
    let audio = AudioManager::new(engine, config.audio.clone())
        .context("failed to initialize audio")?;
    let mut game = Game::new(audio, &library, &config);

    if let Some(path) = &cli.script {
        let script = ScriptedInputPlayer::from_path(path)
            .with_context(|| format!("failed to load scripted input {}", path.display()))?;
        game.set_script(script);
    } else if cli.exit_when_script_finished {
        tracing::warn!("--exit-when-script-finished has no effect without --script");
    }
    if let Some(path) = &cli.event_log {
        game.set_event_log(JsonlSink::create(path)?);
    }

    let stats = headless::run(
        &mut game,
        &HeadlessConfig {
            max_ticks: cli.ticks,
            tick_rate: cli.tick_rate,
            scene: cli.scene.clone(),
            exit_when_script_finished: cli.exit_when_script_finished,
        },
    )?;
    println!(
        "ran {} ticks: {} footsteps, {} dropped plays, peak {} tracked instances",
        stats.ticks, stats.footsteps, stats.dropped_plays, stats.peak_tracked
    );
    Ok(())
}

#[cfg(feature = "rodio_backend")]
fn build_engine(library: &EventLibrary, no_audio: bool) -> Box<dyn AudioEngine> {
    if !no_audio {
        match soundstage_audio::RodioEngine::from_library(library) {
            Ok(engine) => return Box::new(engine),
            Err(err) => tracing::warn!(%err, "Audio output unavailable; using silent engine"),
        }
    }
    Box::new(SimEngine::from_library(library))
}

#[cfg(not(feature = "rodio_backend"))]
fn build_engine(library: &EventLibrary, _no_audio: bool) -> Box<dyn AudioEngine> {
    Box::new(SimEngine::from_library(library))
}
