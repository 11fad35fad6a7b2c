//! Real output through rodio.
//!
//! Each instance is a paused [`Sink`] holding its decoded clip. Bus volumes
//! multiply down the bus tree (`bus:/` → `bus:/SFX` → ...) and are applied to
//! sinks together with a linear distance falloff from the listener. rodio has
//! no authored fade-outs, so both stop modes cut immediately.

use crate::bus::AudioBus;
use crate::engine::{
    Attributes3d, AudioEngine, BusHandle, EmitterRef, EngineError, InstanceId, RigidBody,
    StopMode,
};
use crate::event::{BankEntry, EventLibrary};
use glam::Vec3;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use soundstage_core::AudioPath;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Distance at which spatial instances become inaudible.
pub const MAX_DISTANCE: f32 = 32.0;

struct Clip {
    data: Arc<[u8]>,
    looping: bool,
}

struct RodioBus {
    path: AudioPath,
    volume: f32,
}

struct RodioInstance {
    path: AudioPath,
    bus: AudioPath,
    sink: Sink,
    started: bool,
    position: Option<Vec3>,
    emitter: Option<EmitterRef>,
}

impl RodioInstance {
    /// Where the instance is heard from; `None` for non-spatial instances.
    fn source(&self) -> Option<Vec3> {
        self.emitter
            .as_ref()
            .map(|emitter| emitter.position())
            .or(self.position)
    }
}

/// Engine backed by the default output device.
pub struct RodioEngine {
    /// Output stream (must be kept alive)
    _stream: OutputStream,
    handle: OutputStreamHandle,
    clips: HashMap<AudioPath, Clip>,
    routing: HashMap<AudioPath, AudioPath>,
    buses: Vec<RodioBus>,
    instances: HashMap<InstanceId, RodioInstance>,
    listener: Vec3,
    next_id: u64,
}

impl RodioEngine {
    /// Open the default output device.
    pub fn new() -> Result<Self, EngineError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| EngineError::Backend(format!("failed to open audio output: {e}")))?;
        let mut engine = Self {
            _stream: stream,
            handle,
            clips: HashMap::new(),
            routing: HashMap::new(),
            buses: Vec::new(),
            instances: HashMap::new(),
            listener: Vec3::ZERO,
            next_id: 1,
        };
        for bus in AudioBus::ALL {
            engine.declare_bus(&bus.path());
        }
        Ok(engine)
    }

    /// Open the output device and load every bank entry that names a file.
    pub fn from_library(library: &EventLibrary) -> Result<Self, EngineError> {
        let mut engine = Self::new()?;
        for entry in library.bank() {
            let Some(file) = &entry.file else {
                warn!(path = %entry.path, "Bank entry has no audio file; skipping");
                continue;
            };
            let resolved = library.resolve_file(file);
            match fs::read(&resolved) {
                Ok(data) => engine.load_clip(entry, data),
                Err(err) => warn!(
                    path = %entry.path,
                    file = %resolved.display(),
                    %err,
                    "Failed to read audio file"
                ),
            }
        }
        Ok(engine)
    }

    /// Register encoded audio for a bank entry.
    pub fn load_clip(&mut self, entry: &BankEntry, data: Vec<u8>) {
        self.declare_bus(&entry.bus);
        self.routing.insert(entry.path.clone(), entry.bus.clone());
        self.clips.insert(
            entry.path.clone(),
            Clip {
                data: Arc::from(data),
                looping: entry.length.is_none(),
            },
        );
        debug!(path = %entry.path, "Loaded clip");
    }

    fn declare_bus(&mut self, path: &AudioPath) {
        if !self.buses.iter().any(|b| &b.path == path) {
            self.buses.push(RodioBus {
                path: path.clone(),
                volume: 1.0,
            });
        }
    }

    fn apply_volumes(&mut self) {
        let listener = self.listener;
        for instance in self.instances.values_mut() {
            let attenuation = instance
                .source()
                .map_or(1.0, |position| falloff(listener, position));
            let gain = bus_gain(&self.buses, &instance.bus);
            instance.sink.set_volume(gain * attenuation);
        }
    }

    fn instance_mut(&mut self, id: InstanceId) -> Result<&mut RodioInstance, EngineError> {
        self.instances
            .get_mut(&id)
            .ok_or(EngineError::InvalidHandle(id))
    }
}

fn falloff(listener: Vec3, position: Vec3) -> f32 {
    let distance = position.distance(listener);
    if distance >= MAX_DISTANCE {
        return 0.0;
    }
    1.0 - (distance / MAX_DISTANCE)
}

fn bus_gain(buses: &[RodioBus], routed: &AudioPath) -> f32 {
    buses
        .iter()
        .filter(|bus| routed.is_within(&bus.path))
        .map(|bus| bus.volume)
        .product()
}

impl AudioEngine for RodioEngine {
    fn create_instance(&mut self, path: &AudioPath) -> Result<InstanceId, EngineError> {
        let clip = self
            .clips
            .get(path)
            .ok_or_else(|| EngineError::EventNotFound(path.clone()))?;
        let decoder = Decoder::new(Cursor::new(clip.data.clone()))
            .map_err(|e| EngineError::Backend(format!("failed to decode {path}: {e}")))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| EngineError::Backend(format!("failed to create sink: {e}")))?;
        sink.pause();
        if clip.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }

        let bus = self
            .routing
            .get(path)
            .cloned()
            .unwrap_or_else(AudioPath::master_bus);
        sink.set_volume(bus_gain(&self.buses, &bus));

        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(
            id,
            RodioInstance {
                path: path.clone(),
                bus,
                sink,
                started: false,
                position: None,
                emitter: None,
            },
        );
        Ok(id)
    }

    fn set_parameter(
        &mut self,
        id: InstanceId,
        name: &str,
        value: f32,
    ) -> Result<(), EngineError> {
        let instance = self.instance_mut(id)?;
        match name {
            "pitch" => instance.sink.set_speed(value.max(0.01)),
            _ => trace!(%id, name, value, "Parameter has no rodio mapping"),
        }
        Ok(())
    }

    fn set_3d_attributes(
        &mut self,
        id: InstanceId,
        attributes: Attributes3d,
    ) -> Result<(), EngineError> {
        self.instance_mut(id)?.position = Some(attributes.position);
        self.apply_volumes();
        Ok(())
    }

    fn attach_to_emitter(
        &mut self,
        id: InstanceId,
        emitter: EmitterRef,
        _body: RigidBody,
    ) -> Result<(), EngineError> {
        self.instance_mut(id)?.emitter = Some(emitter);
        self.apply_volumes();
        Ok(())
    }

    fn start(&mut self, id: InstanceId) -> Result<(), EngineError> {
        let instance = self.instance_mut(id)?;
        instance.sink.play();
        instance.started = true;
        Ok(())
    }

    fn release(&mut self, id: InstanceId) -> Result<(), EngineError> {
        let started = self.instance_mut(id)?.started;
        if !started {
            self.instances.remove(&id);
        }
        Ok(())
    }

    fn stop(&mut self, id: InstanceId, _mode: StopMode) -> Result<(), EngineError> {
        let instance = self
            .instances
            .remove(&id)
            .ok_or(EngineError::InvalidHandle(id))?;
        instance.sink.stop();
        trace!(%id, path = %instance.path, "Instance stopped");
        Ok(())
    }

    fn is_valid(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    fn bus(&mut self, path: &AudioPath) -> Result<BusHandle, EngineError> {
        self.buses
            .iter()
            .position(|b| &b.path == path)
            .map(|index| BusHandle(index as u32))
            .ok_or_else(|| EngineError::BusNotFound(path.clone()))
    }

    fn bus_volume(&self, bus: BusHandle) -> Result<f32, EngineError> {
        self.buses
            .get(bus.0 as usize)
            .map(|b| b.volume)
            .ok_or(EngineError::InvalidBus(bus))
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> Result<(), EngineError> {
        let entry = self
            .buses
            .get_mut(bus.0 as usize)
            .ok_or(EngineError::InvalidBus(bus))?;
        entry.volume = volume.max(0.0);
        self.apply_volumes();
        Ok(())
    }

    fn bus_stop_all_events(
        &mut self,
        bus: BusHandle,
        mode: StopMode,
    ) -> Result<(), EngineError> {
        let path = self
            .buses
            .get(bus.0 as usize)
            .map(|b| b.path.clone())
            .ok_or(EngineError::InvalidBus(bus))?;
        let routed: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(_, i)| i.bus.is_within(&path))
            .map(|(id, _)| *id)
            .collect();
        for id in routed {
            self.stop(id, mode)?;
        }
        Ok(())
    }

    fn set_listener(&mut self, listener: Attributes3d) {
        self.listener = listener.position;
        self.apply_volumes();
    }

    fn update(&mut self, _dt: f32) {
        self.instances
            .retain(|_, instance| !(instance.started && instance.sink.empty()));
        self.apply_volumes();
    }
}
