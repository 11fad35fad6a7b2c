//! Audio layer for soundstage.
//!
//! Wraps an event-based audio engine with the bookkeeping gameplay code needs:
//! tracking live instances per event definition, reaping the ones the engine
//! has finished with, and running cancellable volume fades on mixing buses.
//!
//! # Architecture
//!
//! - [`AudioManager`] - Main interface for playing events and controlling buses
//! - [`AudioEngine`] - Engine contract; [`SimEngine`] is the in-memory backend
//! - [`InstanceRegistry`] - Live non-oneshot instances keyed by event
//! - [`BusFader`] - At most one linear ramp per [`AudioBus`]
//! - [`EventLibrary`] - Event definitions and bank entries loaded from JSON
//!
//! # Example
//!
//! ```ignore
//! let library = EventLibrary::from_path(Path::new("content/events.json"))?;
//! let mut audio = AudioManager::new(SimEngine::from_library(&library), AudioSettings::default())?;
//! audio.play(library.get(&key).unwrap(), PlayRequest::new().at(position));
//! audio.fade(AudioBus::Environment, 0.0, 2.0);
//! audio.update(dt);
//! ```

mod bus;
mod engine;
mod event;
mod fader;
mod manager;
mod registry;
#[cfg(feature = "rodio_backend")]
mod rodio_engine;
mod settings;
mod sim;

pub use bus::{AudioBus, BusTable};
pub use engine::{
    Attributes3d, AudioEngine, BusHandle, Emitter, EmitterRef, EngineError, InstanceId,
    RigidBody, StopMode,
};
pub use event::{AudioEvent, BankEntry, ContentError, EventLibrary, PlayRequest};
pub use fader::{BusFader, FadeTask};
pub use manager::{AudioManager, PlayRejection, Playback};
pub use registry::InstanceRegistry;
#[cfg(feature = "rodio_backend")]
pub use rodio_engine::RodioEngine;
pub use settings::{AudioSettings, DEFAULT_REAP_INTERVAL};
pub use sim::{InstanceState, SimEngine, DEFAULT_FADEOUT};

use thiserror::Error;

/// Errors returned by manager construction and bus control.
#[derive(Debug, Error)]
pub enum AudioError {
    /// A bus could not be resolved at startup.
    #[error("failed to resolve {bus} bus: {source}")]
    BusResolution {
        /// Bus being resolved.
        bus: AudioBus,
        /// Engine failure.
        source: EngineError,
    },
    /// Engine failure during a bus operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
