//! The fixed set of mixing buses and their cached engine handles.

use crate::engine::{AudioEngine, BusHandle};
use crate::AudioError;
use serde::{Deserialize, Serialize};
use soundstage_core::AudioPath;
use std::fmt;
use tracing::debug;

/// Mixing buses known to gameplay code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioBus {
    /// Root bus (`bus:/`).
    Master,
    /// Ambience and music (`bus:/Environment`).
    Environment,
    /// Sound effects (`bus:/SFX`).
    Sfx,
}

impl AudioBus {
    /// Every bus, in table order.
    pub const ALL: [AudioBus; 3] = [AudioBus::Master, AudioBus::Environment, AudioBus::Sfx];

    /// Engine path string.
    pub fn path_str(self) -> &'static str {
        match self {
            AudioBus::Master => "bus:/",
            AudioBus::Environment => "bus:/Environment",
            AudioBus::Sfx => "bus:/SFX",
        }
    }

    /// Engine path.
    pub fn path(self) -> AudioPath {
        let root = AudioPath::master_bus();
        match self {
            AudioBus::Master => root,
            AudioBus::Environment => root.child("Environment"),
            AudioBus::Sfx => root.child("SFX"),
        }
    }

    fn index(self) -> usize {
        match self {
            AudioBus::Master => 0,
            AudioBus::Environment => 1,
            AudioBus::Sfx => 2,
        }
    }
}

impl fmt::Display for AudioBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioBus::Master => "master",
            AudioBus::Environment => "environment",
            AudioBus::Sfx => "sfx",
        };
        f.write_str(name)
    }
}

/// Bus handles resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTable {
    handles: [BusHandle; 3],
}

impl BusTable {
    /// Resolve every [`AudioBus`] against the engine.
    pub fn resolve<E: AudioEngine + ?Sized>(engine: &mut E) -> Result<Self, AudioError> {
        let mut handles = [BusHandle(0); 3];
        for bus in AudioBus::ALL {
            let path = bus.path();
            let handle = engine
                .bus(&path)
                .map_err(|source| AudioError::BusResolution { bus, source })?;
            debug!(%bus, %path, ?handle, "Resolved bus");
            handles[bus.index()] = handle;
        }
        Ok(Self { handles })
    }

    /// Cached handle for `bus`.
    pub fn get(&self, bus: AudioBus) -> BusHandle {
        self.handles[bus.index()]
    }

    /// `(bus, handle)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (AudioBus, BusHandle)> + '_ {
        AudioBus::ALL.into_iter().map(move |bus| (bus, self.get(bus)))
    }
}
