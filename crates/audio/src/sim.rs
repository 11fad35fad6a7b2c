//! Deterministic in-memory engine.
//!
//! Plays nothing; keeps just enough state to honour the [`AudioEngine`]
//! contract: instance lifetimes driven by `update`, authored lengths, voice
//! stealing, fade-out stops, bus routing and volumes, and emitters followed
//! every update. Instances become invalid as soon as they stop.

use crate::bus::AudioBus;
use crate::engine::{
    Attributes3d, AudioEngine, BusHandle, EmitterRef, EngineError, InstanceId, RigidBody,
    StopMode,
};
use crate::event::{BankEntry, EventLibrary};
use soundstage_core::AudioPath;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Default seconds an allow-fadeout stop takes.
pub const DEFAULT_FADEOUT: f32 = 0.25;

/// Lifecycle stage of a simulated instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Created, not yet started.
    Created,
    /// Started and audible.
    Playing,
    /// Fading out after an allow-fadeout stop.
    Stopping,
}

#[derive(Debug, Clone)]
struct EventSpec {
    bus: AudioPath,
    length: Option<f32>,
    max_instances: Option<usize>,
}

#[derive(Debug, Clone)]
struct SimBus {
    path: AudioPath,
    volume: f32,
}

struct SimInstance {
    path: AudioPath,
    bus: AudioPath,
    state: InstanceState,
    elapsed: f32,
    fadeout_left: f32,
    length: Option<f32>,
    released: bool,
    parameters: HashMap<String, f32>,
    attributes: Attributes3d,
    emitter: Option<EmitterRef>,
}

/// Engine used by the headless host and tests.
pub struct SimEngine {
    next_id: u64,
    events: HashMap<AudioPath, EventSpec>,
    buses: Vec<SimBus>,
    instances: BTreeMap<InstanceId, SimInstance>,
    fadeout: f32,
    listener: Attributes3d,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    /// Engine with only the master bus declared.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            events: HashMap::new(),
            buses: vec![SimBus {
                path: AudioPath::master_bus(),
                volume: 1.0,
            }],
            instances: BTreeMap::new(),
            fadeout: DEFAULT_FADEOUT,
            listener: Attributes3d::default(),
        }
    }

    /// Engine loaded with every bank entry of `library` plus the standard buses.
    pub fn from_library(library: &EventLibrary) -> Self {
        let mut engine = Self::new().with_standard_buses();
        engine.load_bank(library.bank());
        engine
    }

    /// Set how long allow-fadeout stops take.
    pub fn with_fadeout(mut self, seconds: f32) -> Self {
        self.fadeout = seconds.max(0.0);
        self
    }

    /// Declare every [`AudioBus`] path.
    pub fn with_standard_buses(mut self) -> Self {
        for bus in AudioBus::ALL {
            self.declare_bus(&bus.path());
        }
        self
    }

    /// Declare a bus, returning its handle. Idempotent.
    pub fn declare_bus(&mut self, path: &AudioPath) -> BusHandle {
        if let Some(index) = self.buses.iter().position(|b| &b.path == path) {
            return BusHandle(index as u32);
        }
        self.buses.push(SimBus {
            path: path.clone(),
            volume: 1.0,
        });
        BusHandle((self.buses.len() - 1) as u32)
    }

    /// Register bank entries, declaring the buses they route to.
    pub fn load_bank<'a>(&mut self, entries: impl IntoIterator<Item = &'a BankEntry>) {
        for entry in entries {
            self.declare_bus(&entry.bus);
            self.events.insert(
                entry.path.clone(),
                EventSpec {
                    bus: entry.bus.clone(),
                    length: entry.length,
                    max_instances: entry.max_instances,
                },
            );
            debug!(path = %entry.path, bus = %entry.bus, "Loaded bank entry");
        }
    }

    /// Looping event on the master bus.
    pub fn define_event(&mut self, path: &AudioPath) {
        self.load_bank([&BankEntry::new(path.clone(), AudioPath::master_bus())]);
    }

    /// Finite event on the master bus.
    pub fn define_event_with_length(&mut self, path: &AudioPath, seconds: f32) {
        let entry = BankEntry::new(path.clone(), AudioPath::master_bus()).with_length(seconds);
        self.load_bank([&entry]);
    }

    /// Lifecycle stage of a live instance.
    pub fn instance_state(&self, id: InstanceId) -> Option<InstanceState> {
        self.instances.get(&id).map(|i| i.state)
    }

    /// Parameter last set on a live instance.
    pub fn parameter(&self, id: InstanceId, name: &str) -> Option<f32> {
        self.instances
            .get(&id)
            .and_then(|i| i.parameters.get(name).copied())
    }

    /// 3D attributes of a live instance.
    pub fn attributes(&self, id: InstanceId) -> Option<Attributes3d> {
        self.instances.get(&id).map(|i| i.attributes)
    }

    /// Whether a live instance was released.
    pub fn is_released(&self, id: InstanceId) -> bool {
        self.instances.get(&id).map(|i| i.released).unwrap_or(false)
    }

    /// Number of live instances in any state.
    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of instances currently playing.
    pub fn playing_count(&self) -> usize {
        self.count_in(InstanceState::Playing)
    }

    /// Number of instances fading out.
    pub fn stopping_count(&self) -> usize {
        self.count_in(InstanceState::Stopping)
    }

    /// Number of instances ever created.
    pub fn created_total(&self) -> u64 {
        self.next_id - 1
    }

    /// Number of live instances of `path`.
    pub fn instances_of(&self, path: &AudioPath) -> usize {
        self.instances.values().filter(|i| &i.path == path).count()
    }

    /// Where the listener was last placed.
    pub fn listener(&self) -> Attributes3d {
        self.listener
    }

    /// Volume of the bus at `path`.
    pub fn volume_of(&self, path: &AudioPath) -> Option<f32> {
        self.buses.iter().find(|b| &b.path == path).map(|b| b.volume)
    }

    fn count_in(&self, state: InstanceState) -> usize {
        self.instances.values().filter(|i| i.state == state).count()
    }

    fn instance_mut(&mut self, id: InstanceId) -> Result<&mut SimInstance, EngineError> {
        self.instances
            .get_mut(&id)
            .ok_or(EngineError::InvalidHandle(id))
    }

    fn bus_entry(&self, bus: BusHandle) -> Result<&SimBus, EngineError> {
        self.buses
            .get(bus.0 as usize)
            .ok_or(EngineError::InvalidBus(bus))
    }

    fn steal_voices(&mut self, id: InstanceId, path: &AudioPath) {
        let Some(max) = self.events.get(path).and_then(|spec| spec.max_instances) else {
            return;
        };
        let playing: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(other, i)| {
                **other != id && &i.path == path && i.state != InstanceState::Created
            })
            .map(|(other, _)| *other)
            .collect();
        let excess = (playing.len() + 1).saturating_sub(max.max(1));
        for stolen in playing.into_iter().take(excess) {
            debug!(%path, id = %stolen, "Voice stolen");
            self.instances.remove(&stolen);
        }
    }
}

impl AudioEngine for SimEngine {
    fn create_instance(&mut self, path: &AudioPath) -> Result<InstanceId, EngineError> {
        let spec = self
            .events
            .get(path)
            .ok_or_else(|| EngineError::EventNotFound(path.clone()))?;
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(
            id,
            SimInstance {
                path: path.clone(),
                bus: spec.bus.clone(),
                state: InstanceState::Created,
                elapsed: 0.0,
                fadeout_left: 0.0,
                length: spec.length,
                released: false,
                parameters: HashMap::new(),
                attributes: Attributes3d::default(),
                emitter: None,
            },
        );
        trace!(%path, %id, "Instance created");
        Ok(id)
    }

    fn set_parameter(
        &mut self,
        id: InstanceId,
        name: &str,
        value: f32,
    ) -> Result<(), EngineError> {
        self.instance_mut(id)?
            .parameters
            .insert(name.to_string(), value);
        Ok(())
    }

    fn set_3d_attributes(
        &mut self,
        id: InstanceId,
        attributes: Attributes3d,
    ) -> Result<(), EngineError> {
        self.instance_mut(id)?.attributes = attributes;
        Ok(())
    }

    fn attach_to_emitter(
        &mut self,
        id: InstanceId,
        emitter: EmitterRef,
        body: RigidBody,
    ) -> Result<(), EngineError> {
        let instance = self.instance_mut(id)?;
        instance.attributes = Attributes3d {
            position: emitter.position(),
            velocity: body.velocity,
        };
        instance.emitter = Some(emitter);
        Ok(())
    }

    fn start(&mut self, id: InstanceId) -> Result<(), EngineError> {
        let instance = self.instance_mut(id)?;
        instance.state = InstanceState::Playing;
        instance.elapsed = 0.0;
        let path = instance.path.clone();
        self.steal_voices(id, &path);
        Ok(())
    }

    fn release(&mut self, id: InstanceId) -> Result<(), EngineError> {
        let instance = self.instance_mut(id)?;
        instance.released = true;
        if instance.state == InstanceState::Created {
            self.instances.remove(&id);
        }
        Ok(())
    }

    fn stop(&mut self, id: InstanceId, mode: StopMode) -> Result<(), EngineError> {
        let fadeout = self.fadeout;
        let instance = self.instance_mut(id)?;
        let immediate = mode == StopMode::Immediate
            || fadeout <= 0.0
            || instance.state == InstanceState::Created;
        if immediate {
            self.instances.remove(&id);
        } else if instance.state == InstanceState::Playing {
            instance.state = InstanceState::Stopping;
            instance.fadeout_left = fadeout;
        }
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
        Ok(self.bus_entry(bus)?.volume)
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> Result<(), EngineError> {
        let entry = self
            .buses
            .get_mut(bus.0 as usize)
            .ok_or(EngineError::InvalidBus(bus))?;
        entry.volume = volume.max(0.0);
        Ok(())
    }

    fn bus_stop_all_events(
        &mut self,
        bus: BusHandle,
        mode: StopMode,
    ) -> Result<(), EngineError> {
        let path = self.bus_entry(bus)?.path.clone();
        let routed: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(_, i)| i.bus.is_within(&path))
            .map(|(id, _)| *id)
            .collect();
        debug!(bus = %path, count = routed.len(), "Stopping all events on bus");
        for id in routed {
            self.stop(id, mode)?;
        }
        Ok(())
    }

    fn set_listener(&mut self, listener: Attributes3d) {
        self.listener = listener;
    }

    fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.instances.retain(|id, instance| {
            if let Some(emitter) = &instance.emitter {
                instance.attributes = emitter.attributes();
            }
            match instance.state {
                InstanceState::Created => true,
                InstanceState::Playing => {
                    instance.elapsed += dt;
                    let finished = instance
                        .length
                        .map(|length| instance.elapsed >= length)
                        .unwrap_or(false);
                    if finished {
                        trace!(%id, path = %instance.path, "Instance finished");
                    }
                    !finished
                }
                InstanceState::Stopping => {
                    instance.fadeout_left -= dt;
                    instance.fadeout_left > 0.0
                }
            }
        });
    }
}
