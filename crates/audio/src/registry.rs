//! Active instance registry.
//!
//! Tracks, per event key, the non-oneshot instances that were started and not
//! yet stopped or reaped. Keys exist only while their list is non-empty.

use crate::engine::{AudioEngine, InstanceId, StopMode};
use soundstage_core::EventKey;
use std::collections::HashMap;
use tracing::debug;

/// Event key → live instance handles, in playback order.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    active: HashMap<EventKey, Vec<InstanceId>>,
}

impl InstanceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` under `key`, creating the list if needed.
    pub fn track(&mut self, key: EventKey, id: InstanceId) {
        self.active.entry(key).or_default().push(id);
    }

    /// Remove `id` from `key`'s list, dropping the key once the list is empty.
    ///
    /// Returns whether the handle was tracked.
    pub fn untrack(&mut self, key: &EventKey, id: InstanceId) -> bool {
        let Some(list) = self.active.get_mut(key) else {
            return false;
        };
        let Some(pos) = list.iter().position(|tracked| *tracked == id) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.active.remove(key);
        }
        true
    }

    /// Tracked handles for `key` (empty if none).
    pub fn instances(&self, key: &EventKey) -> &[InstanceId] {
        self.active.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `key` has tracked instances.
    pub fn contains(&self, key: &EventKey) -> bool {
        self.active.contains_key(key)
    }

    /// Number of keys with tracked instances.
    pub fn event_count(&self) -> usize {
        self.active.len()
    }

    /// Total tracked handles across all keys.
    pub fn instance_count(&self) -> usize {
        self.active.values().map(Vec::len).sum()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Iterate over `(key, handles)`.
    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &[InstanceId])> {
        self.active.iter().map(|(key, list)| (key, list.as_slice()))
    }

    /// Gracefully stop every still-valid instance of `key` and forget the key.
    ///
    /// Returns the number of handles removed.
    pub fn stop<E: AudioEngine + ?Sized>(&mut self, key: &EventKey, engine: &mut E) -> usize {
        let Some(list) = self.active.remove(key) else {
            return 0;
        };
        for &id in &list {
            if engine.is_valid(id) {
                if let Err(err) = engine.stop(id, StopMode::AllowFadeout) {
                    debug!(%key, %id, %err, "Stop failed");
                }
            }
        }
        debug!(%key, count = list.len(), "Stopped event");
        list.len()
    }

    /// Gracefully stop every tracked instance and clear the registry.
    ///
    /// Clears unconditionally; handles the engine already invalidated are
    /// dropped along with the rest. Returns the number of handles removed.
    pub fn stop_all<E: AudioEngine + ?Sized>(&mut self, engine: &mut E) -> usize {
        let mut removed = 0;
        for (key, list) in self.active.drain() {
            for id in list {
                removed += 1;
                if let Err(err) = engine.stop(id, StopMode::AllowFadeout) {
                    debug!(%key, %id, %err, "Stop failed");
                }
            }
        }
        removed
    }

    /// Drop handles the engine reports invalid, pruning emptied keys.
    ///
    /// Returns the number of handles removed.
    pub fn reap<E: AudioEngine + ?Sized>(&mut self, engine: &E) -> usize {
        let mut removed = 0;
        self.active.retain(|_, list| {
            let before = list.len();
            list.retain(|&id| engine.is_valid(id));
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimEngine;
    use soundstage_core::AudioPath;

    fn key(name: &str) -> EventKey {
        EventKey::parse(name).unwrap()
    }

    fn started(engine: &mut SimEngine, path: &AudioPath) -> InstanceId {
        let id = engine.create_instance(path).unwrap();
        engine.start(id).unwrap();
        id
    }

    #[test]
    fn untrack_prunes_empty_lists() {
        let mut registry = InstanceRegistry::new();
        let k = key("sfx:hum");
        registry.track(k.clone(), InstanceId(1));
        registry.track(k.clone(), InstanceId(2));

        assert!(registry.untrack(&k, InstanceId(1)));
        assert_eq!(registry.instances(&k), &[InstanceId(2)]);
        assert!(registry.untrack(&k, InstanceId(2)));
        assert!(!registry.contains(&k));
        assert!(!registry.untrack(&k, InstanceId(2)));
    }

    #[test]
    fn stop_removes_key_and_fades_out_instances() {
        let path = AudioPath::parse("event:/Ambience/Hum").unwrap();
        let mut engine = SimEngine::new().with_fadeout(0.5);
        engine.define_event(&path);
        let mut registry = InstanceRegistry::new();
        let k = key("sfx:hum");
        for _ in 0..3 {
            let id = started(&mut engine, &path);
            registry.track(k.clone(), id);
        }

        assert_eq!(registry.stop(&k, &mut engine), 3);
        assert!(registry.is_empty());
        assert_eq!(engine.stopping_count(), 3);
        assert_eq!(registry.stop(&k, &mut engine), 0);
    }

    #[test]
    fn reap_removes_only_invalid_handles() {
        let short = AudioPath::parse("event:/Ui/Click").unwrap();
        let long = AudioPath::parse("event:/Ambience/Hum").unwrap();
        let mut engine = SimEngine::new();
        engine.define_event_with_length(&short, 0.1);
        engine.define_event(&long);

        let mut registry = InstanceRegistry::new();
        let click = key("ui:click");
        let hum = key("sfx:hum");
        let c = started(&mut engine, &short);
        let h1 = started(&mut engine, &long);
        let h2 = started(&mut engine, &long);
        registry.track(click.clone(), c);
        registry.track(hum.clone(), h1);
        registry.track(hum.clone(), h2);

        engine.stop(h1, StopMode::Immediate).unwrap();
        engine.update(0.2);

        assert_eq!(registry.reap(&engine), 2);
        assert!(!registry.contains(&click));
        assert_eq!(registry.instances(&hum), &[h2]);
    }

    #[test]
    fn stop_all_clears_invalid_handles_too() {
        let path = AudioPath::parse("event:/Ambience/Hum").unwrap();
        let mut engine = SimEngine::new();
        engine.define_event(&path);
        let mut registry = InstanceRegistry::new();

        let live = started(&mut engine, &path);
        registry.track(key("sfx:hum"), live);
        registry.track(key("sfx:gone"), InstanceId(9_999));

        assert_eq!(registry.stop_all(&mut engine), 2);
        assert!(registry.is_empty());
    }
}
