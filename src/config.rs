use crate::player::{GroundRegion, GroundType};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use soundstage_audio::AudioSettings;
use soundstage_core::EventKey;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/soundstage.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    pub audio: AudioSettings,
    pub player: PlayerConfig,
    pub events: EventBindings,
    pub scenes: SceneConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Movement speed in metres per second.
    pub speed: f32,
    /// Distance travelled between footsteps.
    pub stride: f32,
    /// Surface used outside every region.
    pub ground: GroundType,
    pub regions: Vec<GroundRegion>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            stride: 1.6,
            ground: GroundType::Grass,
            regions: Vec::new(),
        }
    }
}

/// Which definitions gameplay code plays.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventBindings {
    pub footstep: EventKey,
}

impl Default for EventBindings {
    fn default() -> Self {
        Self {
            footstep: EventKey::new("player", "footstep"),
        }
    }
}

/// Music started when a scene loads. Empty by default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    pub music: BTreeMap<String, EventKey>,
}

impl HostConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<HostConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    HostConfig::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                HostConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}
