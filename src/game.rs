//! Host-side game state: player, scenes and the audio manager they share.

use crate::config::HostConfig;
use crate::event_log::{EventRecord, JsonlSink};
use crate::player::{Footstep, GroundType, MoveInput, PlayerController};
use crate::scene::{SceneAudio, SceneEvents};
use crate::scripted_input::{ScriptAction, ScriptFrame, ScriptedInputPlayer};
use anyhow::Result;
use soundstage_audio::{
    Attributes3d, AudioEngine, AudioEvent, AudioManager, EventLibrary, PlayRequest,
};
use soundstage_core::SimTick;
use tracing::{debug, warn};

/// Counters reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameStats {
    pub ticks: u64,
    pub footsteps: u64,
    pub dropped_plays: u64,
    pub peak_tracked: usize,
}

pub struct Game<E: AudioEngine> {
    audio: AudioManager<E>,
    player: PlayerController,
    footstep: Option<AudioEvent>,
    scenes: SceneEvents<AudioManager<E>>,
    script: Option<ScriptedInputPlayer>,
    log: Option<JsonlSink>,
    tick: SimTick,
    stats: GameStats,
}

impl<E: AudioEngine + 'static> Game<E> {
    pub fn new(audio: AudioManager<E>, library: &EventLibrary, config: &HostConfig) -> Self {
        let footstep = library.get(&config.events.footstep).cloned();
        if footstep.is_none() {
            warn!(event = %config.events.footstep, "Footstep event is not defined");
        }

        let mut scene_audio = SceneAudio::new(&config.scenes.music, library);
        let mut scenes = SceneEvents::new();
        scenes.subscribe(move |scene: &str, audio: &mut AudioManager<E>| {
            scene_audio.on_scene_loaded(scene, audio);
        });

        Self {
            audio,
            player: PlayerController::new(&config.player),
            footstep,
            scenes,
            script: None,
            log: None,
            tick: SimTick::ZERO,
            stats: GameStats::default(),
        }
    }

    pub fn set_script(&mut self, script: ScriptedInputPlayer) {
        self.script = Some(script);
    }

    pub fn set_event_log(&mut self, log: JsonlSink) {
        self.log = Some(log);
    }

    pub fn audio(&self) -> &AudioManager<E> {
        &self.audio
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.scenes.current()
    }

    pub fn tick(&self) -> SimTick {
        self.tick
    }

    pub fn stats(&self) -> GameStats {
        self.stats
    }

    pub fn script_finished(&self) -> bool {
        self.script.as_ref().is_some_and(ScriptedInputPlayer::is_finished)
    }

    pub fn load_scene(&mut self, scene: &str) -> Result<()> {
        self.scenes.scene_loaded(scene, &mut self.audio);
        self.record("scene", scene)
    }

    /// Advance one fixed step.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        self.tick = self.tick.advance(1);
        self.stats.ticks += 1;

        let frame = match &mut self.script {
            Some(script) => script.advance(dt),
            None => ScriptFrame::default(),
        };
        for action in frame.actions {
            self.apply(action)?;
        }

        self.move_player(frame.input, dt)?;
        self.audio.update(dt);
        self.stats.peak_tracked = self
            .stats
            .peak_tracked
            .max(self.audio.registry().instance_count());
        Ok(())
    }

    fn apply(&mut self, action: ScriptAction) -> Result<()> {
        match action {
            ScriptAction::LoadScene(scene) => self.load_scene(&scene),
            ScriptAction::Fade(fade) => {
                self.audio.fade(fade.bus, fade.target, fade.duration);
                self.record(
                    "fade",
                    &format!("{} -> {} over {}s", fade.bus, fade.target, fade.duration),
                )
            }
            ScriptAction::Stop(key) => {
                let stopped = self.audio.stop(&key);
                self.record("stop", &format!("{key} ({stopped})"))
            }
            ScriptAction::StopAll => {
                let stopped = self.audio.stop_active_sounds();
                self.record("stop_all", &stopped.to_string())
            }
        }
    }

    fn move_player(&mut self, input: MoveInput, dt: f32) -> Result<()> {
        let footstep = self.player.fixed_update(input, dt);
        // The listener rides on the player so footsteps are heard up close.
        self.audio.set_listener(Attributes3d {
            position: self.player.position(),
            velocity: self.player.velocity(),
        });
        match footstep {
            Some(footstep) => self.play_footstep(footstep),
            None => Ok(()),
        }
    }

    fn play_footstep(&mut self, footstep: Footstep) -> Result<()> {
        let Some(event) = &self.footstep else {
            warn!(ground = ?footstep.ground, "Footstep dropped: event is not defined");
            self.stats.dropped_plays += 1;
            return Ok(());
        };
        let request = PlayRequest::new()
            .at(footstep.position)
            .param(GroundType::PARAMETER, footstep.ground.parameter_value());
        match self.audio.play(event, request) {
            Some(playback) => {
                self.stats.footsteps += 1;
                debug!(id = %playback.instance(), ground = ?footstep.ground, "Footstep");
                let payload = format!("{:?} at {}", footstep.ground, footstep.position);
                self.record("footstep", &payload)
            }
            None => {
                self.stats.dropped_plays += 1;
                Ok(())
            }
        }
    }

    fn record(&mut self, kind: &str, payload: &str) -> Result<()> {
        if let Some(log) = &mut self.log {
            log.write(&EventRecord {
                tick: self.tick,
                kind,
                payload,
            })?;
        }
        Ok(())
    }

    /// Stop all audio and flush the log.
    pub fn shutdown(&mut self) -> Result<()> {
        self.audio.shutdown();
        if let Some(log) = &mut self.log {
            log.flush()?;
        }
        Ok(())
    }
}
