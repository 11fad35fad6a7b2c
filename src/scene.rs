//! Scene-load notifications and the music they trigger.

use soundstage_audio::{AudioEngine, AudioEvent, AudioManager, EventLibrary, PlayRequest};
use soundstage_core::EventKey;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

type SceneListener<C> = Box<dyn FnMut(&str, &mut C)>;

/// Dispatches `scene_loaded` to every subscriber, in subscription order.
pub struct SceneEvents<C> {
    current: Option<String>,
    listeners: Vec<SceneListener<C>>,
}

impl<C> Default for SceneEvents<C> {
    fn default() -> Self {
        Self {
            current: None,
            listeners: Vec::new(),
        }
    }
}

impl<C> SceneEvents<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&str, &mut C) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn scene_loaded(&mut self, scene: &str, context: &mut C) {
        info!(scene, "Scene loaded");
        self.current = Some(scene.to_string());
        for listener in &mut self.listeners {
            listener(scene, context);
        }
    }
}

/// Plays per-scene music, stopping the previous scene's track.
#[derive(Debug, Default)]
pub struct SceneAudio {
    music: BTreeMap<String, AudioEvent>,
    playing: Option<EventKey>,
}

impl SceneAudio {
    /// Resolve `mapping` against `library`; unknown keys are skipped with a warning.
    pub fn new(mapping: &BTreeMap<String, EventKey>, library: &EventLibrary) -> Self {
        let mut music = BTreeMap::new();
        for (scene, key) in mapping {
            match library.get(key) {
                Some(event) => {
                    music.insert(scene.clone(), event.clone());
                }
                None => warn!(scene, event = %key, "Scene music is not defined; ignoring"),
            }
        }
        Self {
            music,
            playing: None,
        }
    }

    /// Music currently owned by the scene system.
    pub fn playing(&self) -> Option<&EventKey> {
        self.playing.as_ref()
    }

    pub fn on_scene_loaded<E: AudioEngine>(&mut self, scene: &str, audio: &mut AudioManager<E>) {
        let next = self.music.get(scene);
        if next.map(|event| &event.key) == self.playing.as_ref() {
            return;
        }
        if let Some(previous) = self.playing.take() {
            let stopped = audio.stop(&previous);
            debug!(scene, event = %previous, stopped, "Stopped scene music");
        }
        if let Some(event) = next {
            if audio.play(event, PlayRequest::new()).is_some() {
                self.playing = Some(event.key.clone());
            }
        }
    }
}
