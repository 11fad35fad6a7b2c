//! Fixed-step headless runner for the host game.

use crate::game::{Game, GameStats};
use anyhow::Result;
use soundstage_audio::AudioEngine;
use tracing::info;

pub struct HeadlessConfig {
    /// Upper bound on ticks to run.
    pub max_ticks: u64,
    /// Fixed steps per second.
    pub tick_rate: u32,
    /// Scene loaded before the first tick.
    pub scene: Option<String>,
    pub exit_when_script_finished: bool,
}

impl HeadlessConfig {
    fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// Run `game` at a fixed step, then shut it down.
pub fn run<E: AudioEngine + 'static>(
    game: &mut Game<E>,
    cfg: &HeadlessConfig,
) -> Result<GameStats> {
    let dt = cfg.dt();
    if let Some(scene) = &cfg.scene {
        game.load_scene(scene)?;
    }

    let result = run_ticks(game, cfg, dt);
    // Teardown runs even when a tick failed.
    game.shutdown()?;
    result?;

    let stats = game.stats();
    info!(
        ticks = stats.ticks,
        footsteps = stats.footsteps,
        dropped = stats.dropped_plays,
        peak_tracked = stats.peak_tracked,
        position = %game.player().position(),
        "Headless run finished"
    );
    Ok(stats)
}

fn run_ticks<E: AudioEngine + 'static>(
    game: &mut Game<E>,
    cfg: &HeadlessConfig,
    dt: f32,
) -> Result<()> {
    for _ in 0..cfg.max_ticks {
        game.step(dt)?;
        if cfg.exit_when_script_finished && game.script_finished() {
            info!(tick = game.tick().0, "Script finished");
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::scripted_input::ScriptedInputPlayer;
    use soundstage_audio::{AudioManager, EventLibrary, SimEngine};
    use soundstage_core::EventKey;

    fn game() -> Game<SimEngine> {
        let library = EventLibrary::from_json_str(
            r#"{
              "events": [ { "key": "music:title", "path": "event:/Music/Title" } ],
              "bank": [ { "path": "event:/Music/Title", "bus": "bus:/Environment" } ]
            }"#,
        )
        .unwrap();
        let mut config = HostConfig::default();
        config
            .scenes
            .music
            .insert("title".into(), EventKey::new("music", "title"));
        let audio = AudioManager::new(SimEngine::from_library(&library), config.audio.clone())
            .unwrap();
        Game::new(audio, &library, &config)
    }

    #[test]
    fn runs_requested_ticks_and_tears_down() {
        let mut game = game();
        let stats = run(
            &mut game,
            &HeadlessConfig {
                max_ticks: 30,
                tick_rate: 60,
                scene: Some("title".into()),
                exit_when_script_finished: false,
            },
        )
        .unwrap();

        assert_eq!(stats.ticks, 30);
        assert_eq!(stats.peak_tracked, 1);
        assert!(game.audio().registry().is_empty());
    }

    #[test]
    fn stops_early_when_script_ends() {
        let mut game = game();
        game.set_script(
            ScriptedInputPlayer::from_json_str(r#"{ "steps": [ { "duration": 0.5 } ] }"#)
                .unwrap(),
        );
        let stats = run(
            &mut game,
            &HeadlessConfig {
                max_ticks: 1_000,
                tick_rate: 10,
                scene: None,
                exit_when_script_finished: true,
            },
        )
        .unwrap();
        assert!(stats.ticks <= 6, "{stats:?}");
    }
}
