//! Audio manager: event playback, instance tracking and bus control.

use crate::bus::{AudioBus, BusTable};
use crate::engine::{
    Attributes3d, AudioEngine, EmitterRef, EngineError, InstanceId, RigidBody, StopMode,
};
use crate::event::{AudioEvent, PlayRequest};
use crate::fader::BusFader;
use crate::registry::InstanceRegistry;
use crate::settings::AudioSettings;
use crate::AudioError;
use glam::Vec3;
use soundstage_core::{EventKey, IntervalTimer};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a play request was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayRejection {
    /// The definition has no engine event.
    #[error("event {0} has no engine path")]
    Unconfigured(EventKey),
    /// Spatial event played without a position.
    #[error("spatial event {0} played without a position")]
    MissingPosition(EventKey),
    /// Attached event played without an emitter.
    #[error("event {0} attaches to an emitter but none was provided")]
    MissingEmitter(EventKey),
    /// Attached event played on an emitter without a rigid body.
    #[error("event {0} cannot attach to an emitter without a rigid body")]
    MissingRigidBody(EventKey),
    /// The engine refused the request.
    #[error("engine rejected event {key}: {source}")]
    Engine {
        /// Event being played.
        key: EventKey,
        /// Engine failure.
        source: EngineError,
    },
}

/// Result of a successful play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Started and released; not tracked.
    OneShot(InstanceId),
    /// Started and tracked until stopped or reaped.
    Tracked(InstanceId),
}

impl Playback {
    /// Engine handle of the started instance.
    pub fn instance(self) -> InstanceId {
        match self {
            Playback::OneShot(id) | Playback::Tracked(id) => id,
        }
    }
}

/// Main audio manager for the game.
///
/// Owns the engine. The host creates one, hands `&mut` access to whatever
/// needs to play sound, calls [`AudioManager::update`] once per tick and
/// drops it (or calls [`AudioManager::shutdown`]) at exit.
pub struct AudioManager<E: AudioEngine> {
    engine: E,
    buses: BusTable,
    registry: InstanceRegistry,
    fader: BusFader,
    reap_timer: IntervalTimer,
    settings: AudioSettings,
    shut_down: bool,
}

impl<E: AudioEngine> AudioManager<E> {
    /// Resolve buses on `engine` and apply `settings`.
    pub fn new(mut engine: E, settings: AudioSettings) -> Result<Self, AudioError> {
        let settings = settings.sanitized();
        let buses = BusTable::resolve(&mut engine)?;
        for (bus, handle) in buses.iter() {
            engine.set_bus_volume(handle, settings.effective_volume(bus))?;
        }
        debug!(reap_interval = settings.reap_interval, "Audio manager initialized");

        Ok(Self {
            engine,
            buses,
            registry: InstanceRegistry::new(),
            fader: BusFader::new(),
            reap_timer: IntervalTimer::new(settings.reap_interval),
            settings,
            shut_down: false,
        })
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Live tracked instances.
    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// In-flight bus fades.
    pub fn fader(&self) -> &BusFader {
        &self.fader
    }

    /// Cached bus handles.
    pub fn buses(&self) -> &BusTable {
        &self.buses
    }

    /// Get the current audio settings.
    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Replace the settings and write the new levels to every bus.
    ///
    /// Like [`AudioManager::set_bus_volume`], this cancels in-flight fades.
    pub fn update_settings(&mut self, settings: AudioSettings) {
        let settings = settings.sanitized();
        if settings.reap_interval != self.settings.reap_interval {
            self.reap_timer = IntervalTimer::new(settings.reap_interval);
        }
        self.settings = settings;
        for bus in AudioBus::ALL {
            self.set_bus_volume(bus, self.settings.effective_volume(bus));
        }
    }

    /// Play `event`, logging and dropping the request if it cannot be honoured.
    pub fn play(&mut self, event: &AudioEvent, request: PlayRequest) -> Option<Playback> {
        match self.try_play(event, request) {
            Ok(playback) => Some(playback),
            Err(reason) => {
                warn!(event = %event.key, %reason, "Play request dropped");
                None
            }
        }
    }

    /// Play `event`, returning why the request was dropped.
    ///
    /// Validation happens before any engine instance exists; if the engine
    /// fails after creation the instance is released.
    pub fn try_play(
        &mut self,
        event: &AudioEvent,
        request: PlayRequest,
    ) -> Result<Playback, PlayRejection> {
        let key = &event.key;
        let path = event
            .path
            .as_ref()
            .ok_or_else(|| PlayRejection::Unconfigured(key.clone()))?;

        let position = if event.spatial {
            match request.position {
                Some(position) if position != Vec3::ZERO => Some(position),
                _ => return Err(PlayRejection::MissingPosition(key.clone())),
            }
        } else {
            None
        };

        let attachment = if event.attach_to_emitter {
            let emitter = request
                .emitter
                .ok_or_else(|| PlayRejection::MissingEmitter(key.clone()))?;
            let body = emitter
                .rigid_body()
                .ok_or_else(|| PlayRejection::MissingRigidBody(key.clone()))?;
            Some((emitter, body))
        } else {
            None
        };

        let engine_err = |source| PlayRejection::Engine {
            key: key.clone(),
            source,
        };

        let id = self.engine.create_instance(path).map_err(engine_err)?;
        let started = self
            .configure(id, &request.parameters, position, attachment)
            .and_then(|()| self.launch(event, id));

        match started {
            Ok(playback) => {
                debug!(event = %key, %id, ?playback, "Playing event");
                Ok(playback)
            }
            Err(source) => {
                if let Err(err) = self.engine.release(id) {
                    debug!(event = %key, %id, %err, "Release after failed play");
                }
                Err(engine_err(source))
            }
        }
    }

    fn configure(
        &mut self,
        id: InstanceId,
        parameters: &[(String, f32)],
        position: Option<Vec3>,
        attachment: Option<(EmitterRef, RigidBody)>,
    ) -> Result<(), EngineError> {
        for (name, value) in parameters {
            self.engine.set_parameter(id, name, *value)?;
        }
        if let Some(position) = position {
            self.engine.set_3d_attributes(id, Attributes3d::at(position))?;
        }
        if let Some((emitter, body)) = attachment {
            self.engine.attach_to_emitter(id, emitter, body)?;
        }
        Ok(())
    }

    fn launch(&mut self, event: &AudioEvent, id: InstanceId) -> Result<Playback, EngineError> {
        if event.one_shot {
            self.engine.start(id)?;
            // Already audible: a failed release leaks the instance but the play stands.
            if let Err(err) = self.engine.release(id) {
                warn!(event = %event.key, %id, %err, "Failed to release one-shot instance");
            }
            return Ok(Playback::OneShot(id));
        }

        self.registry.track(event.key.clone(), id);
        if let Err(err) = self.engine.start(id) {
            self.registry.untrack(&event.key, id);
            return Err(err);
        }
        Ok(Playback::Tracked(id))
    }

    /// Gracefully stop every tracked instance of `key`.
    ///
    /// Returns the number of handles dropped from the registry.
    pub fn stop(&mut self, key: &EventKey) -> usize {
        self.registry.stop(key, &mut self.engine)
    }

    /// Gracefully stop every tracked instance and clear the registry.
    pub fn stop_active_sounds(&mut self) -> usize {
        let count = self.registry.stop_all(&mut self.engine);
        debug!(count, "Stopped active sounds");
        count
    }

    /// Drop tracked handles the engine no longer considers valid.
    pub fn reap(&mut self) -> usize {
        let removed = self.registry.reap(&self.engine);
        if removed > 0 {
            debug!(removed, remaining = self.registry.instance_count(), "Reaped instances");
        }
        removed
    }

    /// Current level of `bus`, if the engine can report it.
    pub fn bus_volume(&self, bus: AudioBus) -> Option<f32> {
        match self.engine.bus_volume(self.buses.get(bus)) {
            Ok(volume) => Some(volume),
            Err(err) => {
                warn!(%bus, %err, "Failed to read bus volume");
                None
            }
        }
    }

    /// Set `bus` to `volume` immediately, cancelling any fade on it.
    pub fn set_bus_volume(&mut self, bus: AudioBus, volume: f32) {
        if self.fader.cancel(bus).is_some() {
            debug!(%bus, "Fade cancelled by direct volume change");
        }
        if let Err(err) = self.engine.set_bus_volume(self.buses.get(bus), volume) {
            warn!(%bus, %err, "Failed to set bus volume");
        }
    }

    /// Ramp `bus` linearly from its current level to `target` over `duration` seconds.
    ///
    /// Replaces any fade already running on the bus. A non-positive duration
    /// jumps to `target` on the next update.
    pub fn fade(&mut self, bus: AudioBus, target: f32, duration: f32) {
        self.fader.cancel(bus);
        let Some(start) = self.bus_volume(bus) else {
            return;
        };
        self.fader.begin(bus, start, target, duration);
        debug!(%bus, start, target, duration, "Fade started");
    }

    /// Stop the fade on `bus`, leaving the level where the ramp left it.
    pub fn cancel_fade(&mut self, bus: AudioBus) -> bool {
        self.fader.cancel(bus).is_some()
    }

    /// Stop every fade.
    pub fn cancel_all_fades(&mut self) -> usize {
        self.fader.cancel_all()
    }

    /// Whether `bus` has a fade in flight.
    pub fn is_fading(&self, bus: AudioBus) -> bool {
        self.fader.is_fading(bus)
    }

    /// Ask the engine to stop everything routed through `bus`, or every bus.
    pub fn stop_all_sounds(&mut self, bus: Option<AudioBus>) {
        for (candidate, handle) in self.buses.iter() {
            if bus.is_none() || bus == Some(candidate) {
                if let Err(err) = self
                    .engine
                    .bus_stop_all_events(handle, StopMode::AllowFadeout)
                {
                    warn!(bus = %candidate, %err, "Failed to stop bus events");
                }
            }
        }
    }

    /// Move the listener spatial instances are heard from.
    pub fn set_listener(&mut self, listener: Attributes3d) {
        self.engine.set_listener(listener);
    }

    /// Advance one host tick: engine time, bus fades, and the periodic reap.
    pub fn update(&mut self, dt: f32) {
        self.engine.update(dt);

        let engine = &mut self.engine;
        let buses = &self.buses;
        self.fader.advance(dt, |bus, volume| {
            if let Err(err) = engine.set_bus_volume(buses.get(bus), volume) {
                warn!(%bus, %err, "Failed to apply fade step");
            }
        });

        if self.reap_timer.tick(dt) {
            self.reap();
        }
    }

    /// Stop every tracked instance and cancel every fade. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let stopped = self.registry.stop_all(&mut self.engine);
        let fades = self.fader.cancel_all();
        debug!(stopped, fades, "Audio manager shut down");
    }
}

impl<E: AudioEngine> Drop for AudioManager<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Emitter;
    use crate::event::BankEntry;
    use crate::sim::SimEngine;
    use soundstage_core::AudioPath;
    use std::rc::Rc;

    const PAST_FADEOUT: f32 = crate::sim::DEFAULT_FADEOUT + 0.01;

    struct Crate {
        body: Option<RigidBody>,
    }

    impl Emitter for Crate {
        fn position(&self) -> Vec3 {
            Vec3::new(1.0, 2.0, 3.0)
        }

        fn rigid_body(&self) -> Option<RigidBody> {
            self.body
        }
    }

    fn key(s: &str) -> EventKey {
        EventKey::parse(s).unwrap()
    }

    fn path(s: &str) -> AudioPath {
        AudioPath::parse(s).unwrap()
    }

    fn manager() -> AudioManager<SimEngine> {
        let mut engine = SimEngine::new().with_standard_buses();
        engine.load_bank([
            &BankEntry::new(path("event:/Music/Theme"), AudioBus::Environment.path()),
            &BankEntry::new(path("event:/Player/Footstep"), AudioBus::Sfx.path()).with_length(0.3),
        ]);
        AudioManager::new(engine, AudioSettings::default()).expect("buses resolve")
    }

    fn theme() -> AudioEvent {
        AudioEvent::new(key("music:theme"), path("event:/Music/Theme"))
    }

    fn footstep() -> AudioEvent {
        AudioEvent::new(key("player:footstep"), path("event:/Player/Footstep"))
            .one_shot()
            .spatial()
    }

    #[test]
    fn new_applies_settings_to_buses() {
        let audio = manager();
        assert_eq!(audio.bus_volume(AudioBus::Environment), Some(0.7));
        assert_eq!(audio.bus_volume(AudioBus::Master), Some(1.0));
    }

    #[test]
    fn one_shots_are_released_and_untracked() {
        let mut audio = manager();
        for _ in 0..4 {
            let playback = audio
                .try_play(&footstep(), PlayRequest::new().at(Vec3::X))
                .unwrap();
            assert!(matches!(playback, Playback::OneShot(_)));
            assert!(audio.engine().is_released(playback.instance()));
        }
        assert!(audio.registry().is_empty());
    }

    #[test]
    fn parameters_and_position_reach_the_engine() {
        let mut audio = manager();
        let id = audio
            .try_play(
                &footstep(),
                PlayRequest::new().at(Vec3::new(4.0, 0.0, 0.0)).param("ground_type", 2.0),
            )
            .unwrap()
            .instance();
        assert_eq!(audio.engine().parameter(id, "ground_type"), Some(2.0));
        assert_eq!(
            audio.engine().attributes(id).unwrap().position,
            Vec3::new(4.0, 0.0, 0.0)
        );
    }

    #[test]
    fn tracked_instances_accumulate_and_stop_removes_key() {
        let mut audio = manager();
        for _ in 0..3 {
            audio.play(&theme(), PlayRequest::new()).unwrap();
        }
        assert_eq!(audio.registry().instances(&theme().key).len(), 3);

        assert_eq!(audio.stop(&theme().key), 3);
        assert!(!audio.registry().contains(&theme().key));
    }

    #[test]
    fn spatial_without_position_creates_nothing() {
        let mut audio = manager();
        let err = audio.try_play(&footstep(), PlayRequest::new()).unwrap_err();
        assert_eq!(err, PlayRejection::MissingPosition(footstep().key));

        let err = audio
            .try_play(&footstep(), PlayRequest::new().at(Vec3::ZERO))
            .unwrap_err();
        assert!(matches!(err, PlayRejection::MissingPosition(_)));
        assert_eq!(audio.engine().created_total(), 0);
    }

    #[test]
    fn unconfigured_event_is_dropped() {
        let mut audio = manager();
        let mut event = theme();
        event.path = None;
        assert!(audio.play(&event, PlayRequest::new()).is_none());
        assert_eq!(audio.engine().created_total(), 0);
    }

    #[test]
    fn attachment_requires_emitter_with_body() {
        let mut audio = manager();
        let event = theme().attached();

        let err = audio.try_play(&event, PlayRequest::new()).unwrap_err();
        assert!(matches!(err, PlayRejection::MissingEmitter(_)));

        let loose: EmitterRef = Rc::new(Crate { body: None });
        let err = audio
            .try_play(&event, PlayRequest::new().attached_to(loose))
            .unwrap_err();
        assert!(matches!(err, PlayRejection::MissingRigidBody(_)));
        assert_eq!(audio.engine().created_total(), 0);

        let held: EmitterRef = Rc::new(Crate {
            body: Some(RigidBody::default()),
        });
        let id = audio
            .try_play(&event, PlayRequest::new().attached_to(held))
            .unwrap()
            .instance();
        assert_eq!(
            audio.engine().attributes(id).unwrap().position,
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn engine_rejection_leaves_no_instance() {
        let mut audio = manager();
        let event = AudioEvent::new(key("sfx:missing"), path("event:/Not/Loaded"));
        let err = audio.try_play(&event, PlayRequest::new()).unwrap_err();
        assert!(matches!(err, PlayRejection::Engine { .. }));
        assert_eq!(audio.engine().live_count(), 0);
    }

    #[test]
    fn update_reaps_on_interval() {
        let mut audio = manager();
        let step = AudioEvent::new(key("player:step_tracked"), path("event:/Player/Footstep"));
        audio.play(&step, PlayRequest::new()).unwrap();

        audio.update(0.5);
        assert_eq!(audio.registry().instance_count(), 1);
        audio.update(0.6);
        assert!(audio.registry().is_empty());
    }

    #[test]
    fn fade_ramps_and_completes() {
        let mut audio = manager();
        audio.fade(AudioBus::Sfx, 0.0, 1.0);
        audio.update(0.25);
        assert!((audio.bus_volume(AudioBus::Sfx).unwrap() - 0.75).abs() < 1e-5);
        audio.update(1.0);
        assert_eq!(audio.bus_volume(AudioBus::Sfx), Some(0.0));
        assert!(!audio.is_fading(AudioBus::Sfx));
    }

    #[test]
    fn superseding_fade_samples_current_level() {
        let mut audio = manager();
        audio.fade(AudioBus::Sfx, 0.0, 1.0);
        audio.update(0.5);
        audio.fade(AudioBus::Sfx, 1.0, 1.0);
        let task = *audio.fader().task(AudioBus::Sfx).unwrap();
        assert!((task.start - 0.5).abs() < 1e-5);
        assert_eq!(task.target, 1.0);
    }

    #[test]
    fn cancel_fade_freezes_level() {
        let mut audio = manager();
        audio.fade(AudioBus::Master, 0.0, 2.0);
        audio.update(1.0);
        assert!(audio.cancel_fade(AudioBus::Master));
        audio.update(1.0);
        assert!((audio.bus_volume(AudioBus::Master).unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn set_volume_cancels_fade() {
        let mut audio = manager();
        audio.fade(AudioBus::Environment, 0.0, 1.0);
        audio.set_bus_volume(AudioBus::Environment, 0.3);
        audio.update(0.5);
        assert_eq!(audio.bus_volume(AudioBus::Environment), Some(0.3));
    }

    #[test]
    fn stop_all_sounds_targets_one_bus() {
        let mut audio = manager();
        audio.play(&theme(), PlayRequest::new()).unwrap();
        audio.play(&footstep(), PlayRequest::new().at(Vec3::Y)).unwrap();

        audio.stop_all_sounds(Some(AudioBus::Sfx));
        audio.update(PAST_FADEOUT);
        assert_eq!(audio.engine().instances_of(&path("event:/Player/Footstep")), 0);
        assert_eq!(audio.engine().instances_of(&path("event:/Music/Theme")), 1);
    }

    #[test]
    fn shutdown_stops_everything_once() {
        let mut audio = manager();
        audio.play(&theme(), PlayRequest::new()).unwrap();
        audio.fade(AudioBus::Sfx, 0.0, 5.0);

        audio.shutdown();
        assert!(audio.registry().is_empty());
        assert_eq!(audio.fader().active_count(), 0);
        assert_eq!(audio.engine().stopping_count(), 1);
        audio.shutdown();
    }
}
