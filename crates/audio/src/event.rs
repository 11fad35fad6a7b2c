//! Audio event definitions and the content pack they are authored in.
//!
//! A content pack carries two lists:
//! - `events`: gameplay-facing definitions (which engine event, and how it
//!   must be played)
//! - `bank`: engine-side metadata for each engine event (routing bus, length,
//!   source file), consumed by engines when they load

use crate::engine::EmitterRef;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use soundstage_core::{AudioPath, EventKey, PathKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A pre-authored audio event configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
    /// Gameplay-facing name.
    pub key: EventKey,
    /// Engine event to instantiate. `None` means the definition is unconfigured.
    #[serde(default)]
    pub path: Option<AudioPath>,
    /// Fire-and-forget: started then released, never tracked.
    #[serde(default)]
    pub one_shot: bool,
    /// Needs a world position when played.
    #[serde(default)]
    pub spatial: bool,
    /// Follows an emitter with a rigid body.
    #[serde(default)]
    pub attach_to_emitter: bool,
}

impl AudioEvent {
    /// Definition for `path` with every flag cleared.
    pub fn new(key: EventKey, path: AudioPath) -> Self {
        Self {
            key,
            path: Some(path),
            one_shot: false,
            spatial: false,
            attach_to_emitter: false,
        }
    }

    /// Set the one-shot flag.
    pub fn one_shot(mut self) -> Self {
        self.one_shot = true;
        self
    }

    /// Set the spatial flag.
    pub fn spatial(mut self) -> Self {
        self.spatial = true;
        self
    }

    /// Set the attach-to-emitter flag.
    pub fn attached(mut self) -> Self {
        self.attach_to_emitter = true;
        self
    }
}

/// Engine-side metadata for one engine event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
    /// Engine event path.
    pub path: AudioPath,
    /// Bus the event is routed through.
    #[serde(default = "AudioPath::master_bus")]
    pub bus: AudioPath,
    /// Playback length in seconds; `None` loops until stopped.
    #[serde(default)]
    pub length: Option<f32>,
    /// Voice limit; the oldest instance is stolen when exceeded.
    #[serde(default)]
    pub max_instances: Option<usize>,
    /// Audio file, relative to the pack directory.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl BankEntry {
    /// Looping entry routed through `bus`.
    pub fn new(path: AudioPath, bus: AudioPath) -> Self {
        Self {
            path,
            bus,
            length: None,
            max_instances: None,
            file: None,
        }
    }

    /// Set the playback length.
    pub fn with_length(mut self, seconds: f32) -> Self {
        self.length = Some(seconds);
        self
    }

    /// Set the voice limit.
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }
}

/// Errors emitted while loading a content pack.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Wrap IO errors when reading packs.
    #[error("failed to read content pack: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse content pack: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two definitions share a key.
    #[error("duplicate event key {0}")]
    DuplicateKey(EventKey),
    /// Two bank entries share a path.
    #[error("duplicate bank entry {0}")]
    DuplicateBankEntry(AudioPath),
    /// A path of the wrong kind was used (e.g. a bus path as an event).
    #[error("expected a {expected} path, found {found}")]
    WrongPathKind {
        /// Scheme that was required.
        expected: &'static str,
        /// Offending path.
        found: AudioPath,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ContentPackFile {
    #[serde(default)]
    events: Vec<AudioEvent>,
    #[serde(default)]
    bank: Vec<BankEntry>,
}

/// Loaded, validated set of event definitions and bank entries.
#[derive(Debug, Clone, Default)]
pub struct EventLibrary {
    events: BTreeMap<EventKey, AudioEvent>,
    bank: BTreeMap<AudioPath, BankEntry>,
    root: Option<PathBuf>,
}

impl EventLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a content pack from JSON.
    pub fn from_json_str(input: &str) -> Result<Self, ContentError> {
        let file: ContentPackFile = serde_json::from_str(input)?;
        let mut library = Self::new();
        for event in file.events {
            library.insert_event(event)?;
        }
        for entry in file.bank {
            library.insert_bank_entry(entry)?;
        }
        Ok(library)
    }

    /// Load a content pack file; relative bank files resolve against its directory.
    pub fn from_path(path: &Path) -> Result<Self, ContentError> {
        let contents = fs::read_to_string(path)?;
        let mut library = Self::from_json_str(&contents)?;
        library.root = path.parent().map(Path::to_path_buf);
        Ok(library)
    }

    /// Add a definition, rejecting duplicate keys.
    pub fn insert_event(&mut self, event: AudioEvent) -> Result<(), ContentError> {
        if let Some(path) = &event.path {
            if path.kind() != PathKind::Event {
                return Err(ContentError::WrongPathKind {
                    expected: "event",
                    found: path.clone(),
                });
            }
        }
        if self.events.contains_key(&event.key) {
            return Err(ContentError::DuplicateKey(event.key));
        }
        self.events.insert(event.key.clone(), event);
        Ok(())
    }

    /// Add a bank entry, rejecting duplicate paths.
    pub fn insert_bank_entry(&mut self, entry: BankEntry) -> Result<(), ContentError> {
        if entry.path.kind() != PathKind::Event {
            return Err(ContentError::WrongPathKind {
                expected: "event",
                found: entry.path,
            });
        }
        if entry.bus.kind() != PathKind::Bus {
            return Err(ContentError::WrongPathKind {
                expected: "bus",
                found: entry.bus,
            });
        }
        if self.bank.contains_key(&entry.path) {
            return Err(ContentError::DuplicateBankEntry(entry.path));
        }
        self.bank.insert(entry.path.clone(), entry);
        Ok(())
    }

    /// Look up a definition.
    pub fn get(&self, key: &EventKey) -> Option<&AudioEvent> {
        self.events.get(key)
    }

    /// Definitions in key order.
    pub fn events(&self) -> impl Iterator<Item = &AudioEvent> {
        self.events.values()
    }

    /// Bank entries in path order.
    pub fn bank(&self) -> impl Iterator<Item = &BankEntry> {
        self.bank.values()
    }

    /// Every bus path referenced by the bank.
    pub fn bus_paths(&self) -> BTreeSet<AudioPath> {
        self.bank.values().map(|entry| entry.bus.clone()).collect()
    }

    /// Resolve a bank file against the pack directory.
    pub fn resolve_file(&self, file: &Path) -> PathBuf {
        match &self.root {
            Some(root) if file.is_relative() => root.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the library has no definitions.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Per-call playback details.
#[derive(Clone, Default)]
pub struct PlayRequest {
    /// World position for spatial events.
    pub position: Option<Vec3>,
    /// Emitter to follow for attached events.
    pub emitter: Option<EmitterRef>,
    /// Named parameters forwarded before start.
    pub parameters: Vec<(String, f32)>,
}

impl PlayRequest {
    /// Request with no position, emitter or parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Play at a world position.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Follow an emitter.
    pub fn attached_to(mut self, emitter: EmitterRef) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Add a named parameter.
    pub fn param(mut self, name: impl Into<String>, value: f32) -> Self {
        self.parameters.push((name.into(), value));
        self
    }
}

impl std::fmt::Debug for PlayRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayRequest")
            .field("position", &self.position)
            .field("emitter", &self.emitter.as_ref().map(|e| e.position()))
            .field("parameters", &self.parameters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACK: &str = r#"
    {
      "events": [
        { "key": "player:footstep", "path": "event:/Player/Footstep", "one_shot": true, "spatial": true },
        { "key": "music/title", "path": "event:/Music/Title" },
        { "key": "sfx:placeholder" }
      ],
      "bank": [
        { "path": "event:/Player/Footstep", "bus": "bus:/SFX", "length": 0.4 },
        { "path": "event:/Music/Title", "bus": "bus:/Environment", "file": "music/title.ogg" }
      ]
    }
    "#;

    #[test]
    fn parses_pack() {
        let library = EventLibrary::from_json_str(PACK).expect("valid pack");
        assert_eq!(library.len(), 3);

        let step = library
            .get(&EventKey::parse("player:footstep").unwrap())
            .expect("footstep defined");
        assert!(step.one_shot && step.spatial && !step.attach_to_emitter);

        let placeholder = library
            .get(&EventKey::parse("sfx:placeholder").unwrap())
            .expect("placeholder defined");
        assert!(placeholder.path.is_none());

        let buses: Vec<String> = library.bus_paths().into_iter().map(String::from).collect();
        assert_eq!(buses, vec!["bus:/Environment", "bus:/SFX"]);
    }

    #[test]
    fn bank_defaults_route_to_master_and_loop() {
        let library =
            EventLibrary::from_json_str(r#"{ "bank": [ { "path": "event:/Ambience/Wind" } ] }"#)
                .unwrap();
        let entry = library.bank().next().unwrap();
        assert_eq!(entry.bus, AudioPath::master_bus());
        assert_eq!(entry.length, None);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = EventLibrary::from_json_str(
            r#"{ "events": [ { "key": "a:b" }, { "key": "a:b" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateKey(_)));
    }

    #[test]
    fn rejects_bus_path_as_event() {
        let err = EventLibrary::from_json_str(
            r#"{ "events": [ { "key": "a:b", "path": "bus:/SFX" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::WrongPathKind { .. }));
    }

    #[test]
    fn relative_files_resolve_against_pack_dir() {
        let mut library = EventLibrary::new();
        library.root = Some(PathBuf::from("packs/base"));
        assert_eq!(
            library.resolve_file(Path::new("music/title.ogg")),
            PathBuf::from("packs/base/music/title.ogg")
        );
    }
}
