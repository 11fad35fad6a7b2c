//! Audio settings and bus volume controls.

use crate::bus::AudioBus;
use serde::{Deserialize, Serialize};

/// Seconds between sweeps for finished instances.
pub const DEFAULT_REAP_INTERVAL: f32 = 1.0;

/// Bus volumes and housekeeping cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master bus volume (0.0 to 1.0)
    pub master: f32,
    /// Environment bus volume (0.0 to 1.0)
    pub environment: f32,
    /// Sound effects bus volume (0.0 to 1.0)
    pub sfx: f32,
    /// Whether audio is muted
    pub muted: bool,
    /// Seconds between sweeps of finished instances
    pub reap_interval: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            environment: 0.7,
            sfx: 1.0,
            muted: false,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl AudioSettings {
    /// Create new audio settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured volume for `bus`, ignoring mute.
    pub fn volume(&self, bus: AudioBus) -> f32 {
        match bus {
            AudioBus::Master => self.master,
            AudioBus::Environment => self.environment,
            AudioBus::Sfx => self.sfx,
        }
    }

    /// Level to write to `bus` on the engine. Mute silences the master bus only.
    pub fn effective_volume(&self, bus: AudioBus) -> f32 {
        if self.muted && bus == AudioBus::Master {
            0.0
        } else {
            self.volume(bus)
        }
    }

    /// Set the volume for `bus` (clamped to 0.0-1.0).
    pub fn set_volume(&mut self, bus: AudioBus, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        match bus {
            AudioBus::Master => self.master = volume,
            AudioBus::Environment => self.environment = volume,
            AudioBus::Sfx => self.sfx = volume,
        }
    }

    /// Toggle mute state.
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Clamp every field into range.
    pub fn sanitized(mut self) -> Self {
        for bus in AudioBus::ALL {
            self.set_volume(bus, self.volume(bus));
        }
        if !self.reap_interval.is_finite() || self.reap_interval < 0.0 {
            self.reap_interval = DEFAULT_REAP_INTERVAL;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AudioSettings::default();
        assert_eq!(settings.master, 1.0);
        assert_eq!(settings.environment, 0.7);
        assert_eq!(settings.reap_interval, 1.0);
        assert!(!settings.muted);
    }

    #[test]
    fn test_mute_silences_master_only() {
        let mut settings = AudioSettings::default();
        settings.toggle_mute();
        assert_eq!(settings.effective_volume(AudioBus::Master), 0.0);
        assert_eq!(settings.effective_volume(AudioBus::Sfx), 1.0);

        settings.toggle_mute();
        assert_eq!(settings.effective_volume(AudioBus::Master), 1.0);
    }

    #[test]
    fn test_volume_clamping() {
        let mut settings = AudioSettings::default();
        settings.set_volume(AudioBus::Master, 1.5);
        assert_eq!(settings.master, 1.0);

        settings.set_volume(AudioBus::Sfx, -0.5);
        assert_eq!(settings.sfx, 0.0);
    }

    #[test]
    fn test_sanitize_restores_bad_interval() {
        let settings = AudioSettings {
            environment: 3.0,
            reap_interval: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.environment, 1.0);
        assert_eq!(settings.reap_interval, DEFAULT_REAP_INTERVAL);
    }
}
