use crate::player::MoveInput;
use serde::Deserialize;
use soundstage_audio::AudioBus;
use soundstage_core::EventKey;
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ScriptedStep {
    duration: f32,
    #[serde(default)]
    move_x: f32,
    #[serde(default)]
    move_z: f32,
    /// Scene loaded when the step begins.
    #[serde(default)]
    scene: Option<String>,
    #[serde(default)]
    fade: Option<FadeCommand>,
    #[serde(default)]
    stop: Option<EventKey>,
    #[serde(default)]
    stop_all: bool,
}

/// Bus fade requested by a script step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FadeCommand {
    pub bus: AudioBus,
    pub target: f32,
    pub duration: f32,
}

/// One-off action fired when a step begins.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    LoadScene(String),
    Fade(FadeCommand),
    Stop(EventKey),
    StopAll,
}

/// Input and actions for one tick.
#[derive(Debug, Default)]
pub struct ScriptFrame {
    pub input: MoveInput,
    pub actions: Vec<ScriptAction>,
}

pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    time_in_step: f32,
    entered: bool,
    finished: bool,
}

impl ScriptedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        let file: ScriptedInputFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        Ok(Self {
            steps: file.steps,
            index: 0,
            time_in_step: 0.0,
            entered: false,
            finished: false,
        })
    }

    /// Whether the last step has run its full duration.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn advance(&mut self, dt: f32) -> ScriptFrame {
        let mut actions = Vec::new();
        if self.steps.is_empty() {
            return ScriptFrame::default();
        }
        if !self.entered {
            self.entered = true;
            self.steps[self.index].collect_actions(&mut actions);
        }

        self.time_in_step += dt;
        while self.index < self.steps.len() && self.time_in_step >= self.steps[self.index].duration
        {
            self.time_in_step -= self.steps[self.index].duration;
            if self.index + 1 < self.steps.len() {
                self.index += 1;
                self.steps[self.index].collect_actions(&mut actions);
            } else {
                self.time_in_step = 0.0;
                self.finished = true;
                break;
            }
        }

        let step = self.steps.get(self.index).cloned().unwrap_or_default();
        ScriptFrame {
            input: MoveInput::new(step.move_x, step.move_z),
            actions,
        }
    }
}

impl ScriptedStep {
    fn collect_actions(&self, actions: &mut Vec<ScriptAction>) {
        if let Some(scene) = &self.scene {
            actions.push(ScriptAction::LoadScene(scene.clone()));
        }
        if let Some(fade) = self.fade {
            actions.push(ScriptAction::Fade(fade));
        }
        if let Some(key) = &self.stop {
            actions.push(ScriptAction::Stop(key.clone()));
        }
        if self.stop_all {
            actions.push(ScriptAction::StopAll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
    {
      "steps": [
        { "duration": 0.5, "move_z": 1.0, "scene": "forest" },
        { "duration": 0.5, "move_x": -1.0, "fade": { "bus": "environment", "target": 0.0, "duration": 2.0 } },
        { "duration": 1.0, "stop": "music:forest" }
      ]
    }
    "#;

    #[test]
    fn first_frame_fires_entry_actions() {
        let mut script = ScriptedInputPlayer::from_json_str(SCRIPT).unwrap();
        let frame = script.advance(0.1);
        assert_eq!(frame.input, MoveInput::new(0.0, 1.0));
        assert_eq!(frame.actions, vec![ScriptAction::LoadScene("forest".into())]);
        assert!(script.advance(0.1).actions.is_empty());
    }

    #[test]
    fn crossing_a_boundary_switches_input_and_fires_actions() {
        let mut script = ScriptedInputPlayer::from_json_str(SCRIPT).unwrap();
        script.advance(0.25);
        let frame = script.advance(0.25);
        assert_eq!(frame.input, MoveInput::new(-1.0, 0.0));
        assert_eq!(
            frame.actions,
            vec![ScriptAction::Fade(FadeCommand {
                bus: AudioBus::Environment,
                target: 0.0,
                duration: 2.0,
            })]
        );
    }

    #[test]
    fn holds_last_step_when_done() {
        let mut script = ScriptedInputPlayer::from_json_str(SCRIPT).unwrap();
        let frame = script.advance(5.0);
        assert_eq!(frame.actions.len(), 3);
        assert!(script.is_finished());
        assert_eq!(script.advance(1.0).input, MoveInput::default());
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(ScriptedInputPlayer::from_json_str(r#"{ "steps": [] }"#).is_err());
    }
}
