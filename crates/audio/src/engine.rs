//! The audio engine contract the manager drives.
//!
//! The engine owns playback: instance creation, mixing, voice stealing and
//! bus routing all happen behind [`AudioEngine`]. The manager only keeps
//! bookkeeping on top of it.

use glam::Vec3;
use soundstage_core::AudioPath;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Opaque handle to one live event instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine-side bus handle, resolved once from a bus path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusHandle(pub u32);

/// How an instance or bus is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopMode {
    /// Cut immediately.
    Immediate,
    /// Let the event play its authored fade-out before stopping.
    AllowFadeout,
}

/// Position and velocity of a sound source in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attributes3d {
    /// World position.
    pub position: Vec3,
    /// Velocity used for doppler.
    pub velocity: Vec3,
}

impl Attributes3d {
    /// Stationary source at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
        }
    }
}

/// Physical body of an emitter; attachment needs one to read velocity from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RigidBody {
    /// Current linear velocity.
    pub velocity: Vec3,
}

/// A world object an instance can follow.
pub trait Emitter {
    /// Current world position.
    fn position(&self) -> Vec3;

    /// Physical body, if the object has one.
    fn rigid_body(&self) -> Option<RigidBody>;

    /// Current 3D attributes derived from position and body.
    fn attributes(&self) -> Attributes3d {
        Attributes3d {
            position: self.position(),
            velocity: self.rigid_body().map(|b| b.velocity).unwrap_or(Vec3::ZERO),
        }
    }
}

/// Shared handle to an emitter. The engine keeps it while the instance lives.
pub type EmitterRef = Rc<dyn Emitter>;

/// Errors reported by an engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The handle does not refer to a live instance.
    #[error("invalid instance handle {0}")]
    InvalidHandle(InstanceId),
    /// The event path is not in any loaded bank.
    #[error("event not found: {0}")]
    EventNotFound(AudioPath),
    /// The bus path is not in any loaded bank.
    #[error("bus not found: {0}")]
    BusNotFound(AudioPath),
    /// Unknown bus handle.
    #[error("invalid bus handle {0:?}")]
    InvalidBus(BusHandle),
    /// Backend-specific failure.
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Operations the manager consumes from an audio engine.
pub trait AudioEngine {
    /// Create a stopped instance of the event at `path`.
    fn create_instance(&mut self, path: &AudioPath) -> Result<InstanceId, EngineError>;

    /// Set a named numeric parameter on an instance.
    fn set_parameter(&mut self, id: InstanceId, name: &str, value: f32)
        -> Result<(), EngineError>;

    /// Position an instance in the world.
    fn set_3d_attributes(&mut self, id: InstanceId, attributes: Attributes3d)
        -> Result<(), EngineError>;

    /// Make an instance follow `emitter` on every engine update.
    fn attach_to_emitter(
        &mut self,
        id: InstanceId,
        emitter: EmitterRef,
        body: RigidBody,
    ) -> Result<(), EngineError>;

    /// Start playback.
    fn start(&mut self, id: InstanceId) -> Result<(), EngineError>;

    /// Mark an instance to be destroyed once it stops.
    fn release(&mut self, id: InstanceId) -> Result<(), EngineError>;

    /// Stop playback.
    fn stop(&mut self, id: InstanceId, mode: StopMode) -> Result<(), EngineError>;

    /// Whether the handle still refers to a live instance.
    fn is_valid(&self, id: InstanceId) -> bool;

    /// Resolve a bus path to a handle.
    fn bus(&mut self, path: &AudioPath) -> Result<BusHandle, EngineError>;

    /// Current bus fader level.
    fn bus_volume(&self, bus: BusHandle) -> Result<f32, EngineError>;

    /// Set the bus fader level.
    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> Result<(), EngineError>;

    /// Stop every event routed through the bus.
    fn bus_stop_all_events(&mut self, bus: BusHandle, mode: StopMode)
        -> Result<(), EngineError>;

    /// Move the listener that spatial instances are heard from.
    fn set_listener(&mut self, _listener: Attributes3d) {}

    /// Advance engine time. Called once per host tick.
    fn update(&mut self, _dt: f32) {}
}

impl<E: AudioEngine + ?Sized> AudioEngine for Box<E> {
    fn create_instance(&mut self, path: &AudioPath) -> Result<InstanceId, EngineError> {
        (**self).create_instance(path)
    }

    fn set_parameter(
        &mut self,
        id: InstanceId,
        name: &str,
        value: f32,
    ) -> Result<(), EngineError> {
        (**self).set_parameter(id, name, value)
    }

    fn set_3d_attributes(
        &mut self,
        id: InstanceId,
        attributes: Attributes3d,
    ) -> Result<(), EngineError> {
        (**self).set_3d_attributes(id, attributes)
    }

    fn attach_to_emitter(
        &mut self,
        id: InstanceId,
        emitter: EmitterRef,
        body: RigidBody,
    ) -> Result<(), EngineError> {
        (**self).attach_to_emitter(id, emitter, body)
    }

    fn start(&mut self, id: InstanceId) -> Result<(), EngineError> {
        (**self).start(id)
    }

    fn release(&mut self, id: InstanceId) -> Result<(), EngineError> {
        (**self).release(id)
    }

    fn stop(&mut self, id: InstanceId, mode: StopMode) -> Result<(), EngineError> {
        (**self).stop(id, mode)
    }

    fn is_valid(&self, id: InstanceId) -> bool {
        (**self).is_valid(id)
    }

    fn bus(&mut self, path: &AudioPath) -> Result<BusHandle, EngineError> {
        (**self).bus(path)
    }

    fn bus_volume(&self, bus: BusHandle) -> Result<f32, EngineError> {
        (**self).bus_volume(bus)
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> Result<(), EngineError> {
        (**self).set_bus_volume(bus, volume)
    }

    fn bus_stop_all_events(
        &mut self,
        bus: BusHandle,
        mode: StopMode,
    ) -> Result<(), EngineError> {
        (**self).bus_stop_all_events(bus, mode)
    }

    fn set_listener(&mut self, listener: Attributes3d) {
        (**self).set_listener(listener)
    }

    fn update(&mut self, dt: f32) {
        (**self).update(dt)
    }
}
