//! Engine double that records every call.
//!
//! Instances stay valid until the test invalidates them (or they are released
//! before starting), so reap and stop behaviour can be driven explicitly.
//! Individual operations can be made to fail to exercise recovery paths.

use glam::Vec3;
use soundstage_audio::{
    Attributes3d, AudioBus, AudioEngine, BusHandle, EmitterRef, EngineError, InstanceId,
    RigidBody, StopMode,
};
use soundstage_core::AudioPath;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

/// Call log that outlives the engine (e.g. to observe teardown on drop).
pub type SharedCalls = Rc<RefCell<Vec<EngineCall>>>;

/// One engine call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `create_instance`
    Create {
        /// New handle.
        id: InstanceId,
        /// Event path.
        path: String,
    },
    /// `set_parameter`
    SetParameter {
        /// Target instance.
        id: InstanceId,
        /// Parameter name.
        name: String,
        /// Value.
        value: f32,
    },
    /// `set_3d_attributes`
    Set3d {
        /// Target instance.
        id: InstanceId,
        /// World position.
        position: Vec3,
    },
    /// `attach_to_emitter`
    Attach(InstanceId),
    /// `start`
    Start(InstanceId),
    /// `release`
    Release(InstanceId),
    /// `stop`
    Stop {
        /// Target instance.
        id: InstanceId,
        /// Stop mode.
        mode: StopMode,
    },
    /// `set_bus_volume`
    SetBusVolume {
        /// Bus path.
        bus: String,
        /// Level written.
        volume: f32,
    },
    /// `bus_stop_all_events`
    BusStopAll {
        /// Bus path.
        bus: String,
        /// Stop mode.
        mode: StopMode,
    },
    /// `set_listener`
    Listener(Vec3),
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    /// `create_instance`
    Create,
    /// `set_parameter`
    SetParameter,
    /// `set_3d_attributes`
    Set3d,
    /// `attach_to_emitter`
    Attach,
    /// `start`
    Start,
    /// `release`
    Release,
}

/// Call-recording [`AudioEngine`].
#[derive(Debug)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
    shared: Option<SharedCalls>,
    live: BTreeSet<InstanceId>,
    started: BTreeSet<InstanceId>,
    released: BTreeSet<InstanceId>,
    buses: Vec<(AudioPath, f32)>,
    failing: HashSet<EngineOp>,
    next_id: u64,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    /// Engine with the standard buses declared at volume 1.0.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            shared: None,
            live: BTreeSet::new(),
            started: BTreeSet::new(),
            released: BTreeSet::new(),
            buses: AudioBus::ALL.iter().map(|bus| (bus.path(), 1.0)).collect(),
            failing: HashSet::new(),
            next_id: 1,
        }
    }

    /// Engine that knows no buses at all.
    pub fn without_buses() -> Self {
        Self {
            buses: Vec::new(),
            ..Self::new()
        }
    }

    /// Make `op` fail from now on.
    pub fn fail_on(&mut self, op: EngineOp) {
        self.failing.insert(op);
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Mirror every future call into a log the caller keeps.
    pub fn share_calls(&mut self) -> SharedCalls {
        self.shared.get_or_insert_with(SharedCalls::default).clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    /// Mark a handle as finished.
    pub fn invalidate(&mut self, id: InstanceId) {
        self.live.remove(&id);
    }

    /// Mark every handle as finished.
    pub fn invalidate_all(&mut self) {
        self.live.clear();
    }

    /// Handles still valid.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Handles ever created.
    pub fn created_count(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Create { .. }))
    }

    /// Whether `id` was started.
    pub fn is_started(&self, id: InstanceId) -> bool {
        self.started.contains(&id)
    }

    /// Whether `id` was released.
    pub fn is_released(&self, id: InstanceId) -> bool {
        self.released.contains(&id)
    }

    /// Current level of the bus at `path`.
    pub fn volume(&self, path: &AudioPath) -> Option<f32> {
        self.buses
            .iter()
            .find(|(bus, _)| bus == path)
            .map(|(_, volume)| *volume)
    }

    fn record(&mut self, call: EngineCall) {
        if let Some(shared) = &self.shared {
            shared.borrow_mut().push(call.clone());
        }
        self.calls.push(call);
    }

    fn check(&self, op: EngineOp) -> Result<(), EngineError> {
        if self.failing.contains(&op) {
            Err(EngineError::Backend(format!("injected {op:?} failure")))
        } else {
            Ok(())
        }
    }

    fn check_live(&self, id: InstanceId) -> Result<(), EngineError> {
        if self.live.contains(&id) {
            Ok(())
        } else {
            Err(EngineError::InvalidHandle(id))
        }
    }

    fn bus_path(&self, bus: BusHandle) -> Result<AudioPath, EngineError> {
        self.buses
            .get(bus.0 as usize)
            .map(|(path, _)| path.clone())
            .ok_or(EngineError::InvalidBus(bus))
    }
}

impl AudioEngine for RecordingEngine {
    fn create_instance(&mut self, path: &AudioPath) -> Result<InstanceId, EngineError> {
        self.check(EngineOp::Create)?;
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        self.record(EngineCall::Create {
            id,
            path: path.to_string(),
        });
        Ok(id)
    }

    fn set_parameter(
        &mut self,
        id: InstanceId,
        name: &str,
        value: f32,
    ) -> Result<(), EngineError> {
        self.check(EngineOp::SetParameter)?;
        self.check_live(id)?;
        self.record(EngineCall::SetParameter {
            id,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_3d_attributes(
        &mut self,
        id: InstanceId,
        attributes: Attributes3d,
    ) -> Result<(), EngineError> {
        self.check(EngineOp::Set3d)?;
        self.check_live(id)?;
        self.record(EngineCall::Set3d {
            id,
            position: attributes.position,
        });
        Ok(())
    }

    fn attach_to_emitter(
        &mut self,
        id: InstanceId,
        _emitter: EmitterRef,
        _body: RigidBody,
    ) -> Result<(), EngineError> {
        self.check(EngineOp::Attach)?;
        self.check_live(id)?;
        self.record(EngineCall::Attach(id));
        Ok(())
    }

    fn start(&mut self, id: InstanceId) -> Result<(), EngineError> {
        self.check(EngineOp::Start)?;
        self.check_live(id)?;
        self.started.insert(id);
        self.record(EngineCall::Start(id));
        Ok(())
    }

    fn release(&mut self, id: InstanceId) -> Result<(), EngineError> {
        self.check(EngineOp::Release)?;
        self.check_live(id)?;
        self.released.insert(id);
        if !self.started.contains(&id) {
            self.live.remove(&id);
        }
        self.record(EngineCall::Release(id));
        Ok(())
    }

    fn stop(&mut self, id: InstanceId, mode: StopMode) -> Result<(), EngineError> {
        self.record(EngineCall::Stop { id, mode });
        self.check_live(id)
    }

    fn is_valid(&self, id: InstanceId) -> bool {
        self.live.contains(&id)
    }

    fn bus(&mut self, path: &AudioPath) -> Result<BusHandle, EngineError> {
        self.buses
            .iter()
            .position(|(bus, _)| bus == path)
            .map(|index| BusHandle(index as u32))
            .ok_or_else(|| EngineError::BusNotFound(path.clone()))
    }

    fn bus_volume(&self, bus: BusHandle) -> Result<f32, EngineError> {
        self.buses
            .get(bus.0 as usize)
            .map(|(_, volume)| *volume)
            .ok_or(EngineError::InvalidBus(bus))
    }

    fn set_bus_volume(&mut self, bus: BusHandle, volume: f32) -> Result<(), EngineError> {
        let path = self.bus_path(bus)?;
        self.buses[bus.0 as usize].1 = volume;
        self.record(EngineCall::SetBusVolume {
            bus: path.to_string(),
            volume,
        });
        Ok(())
    }

    fn bus_stop_all_events(
        &mut self,
        bus: BusHandle,
        mode: StopMode,
    ) -> Result<(), EngineError> {
        let path = self.bus_path(bus)?;
        self.record(EngineCall::BusStopAll {
            bus: path.to_string(),
            mode,
        });
        Ok(())
    }

    fn set_listener(&mut self, listener: Attributes3d) {
        self.record(EngineCall::Listener(listener.position));
    }
}
