//! Property-based tests for the instance registry
//!
//! Validates:
//! - Reaping removes exactly the handles the engine invalidated
//! - Keys never survive with an empty list
//! - `stop_all` clears everything, valid or not

use proptest::prelude::*;
use soundstage_audio::{AudioEngine, InstanceId, InstanceRegistry, SimEngine, StopMode};
use soundstage_core::{AudioPath, EventKey};
use std::collections::BTreeSet;

const KEYS: [&str; 3] = ["music:theme", "ambience:wind", "sfx:engine"];

/// Plays `plan` (key index, killed?) and returns the registry plus killed handles.
fn populate(
    engine: &mut SimEngine,
    plan: &[(usize, bool)],
) -> (InstanceRegistry, BTreeSet<InstanceId>) {
    let path = AudioPath::parse("event:/Loop").unwrap();
    engine.define_event(&path);

    let mut registry = InstanceRegistry::new();
    let mut killed = BTreeSet::new();
    for &(key, kill) in plan {
        let id = engine.create_instance(&path).unwrap();
        engine.start(id).unwrap();
        registry.track(EventKey::parse(KEYS[key]).unwrap(), id);
        if kill {
            killed.insert(id);
        }
    }
    for &id in &killed {
        engine.stop(id, StopMode::Immediate).unwrap();
    }
    (registry, killed)
}

proptest! {
    /// Property: reap removes exactly the invalid handles
    #[test]
    fn reap_removes_exactly_invalid_handles(
        plan in prop::collection::vec((0usize..KEYS.len(), any::<bool>()), 0..40),
    ) {
        let mut engine = SimEngine::new();
        let (mut registry, killed) = populate(&mut engine, &plan);
        let before = registry.instance_count();

        let removed = registry.reap(&engine);

        prop_assert_eq!(removed, killed.len());
        prop_assert_eq!(registry.instance_count(), before - killed.len());
        for (key, handles) in registry.iter() {
            prop_assert!(!handles.is_empty(), "key {} kept with no handles", key);
            for id in handles {
                prop_assert!(engine.is_valid(*id));
                prop_assert!(!killed.contains(id));
            }
        }

        // A second pass finds nothing.
        prop_assert_eq!(registry.reap(&engine), 0);
    }

    /// Property: stop_all empties the registry regardless of validity
    #[test]
    fn stop_all_clears_everything(
        plan in prop::collection::vec((0usize..KEYS.len(), any::<bool>()), 0..40),
    ) {
        let mut engine = SimEngine::new().with_fadeout(0.0);
        let (mut registry, _) = populate(&mut engine, &plan);

        let removed = registry.stop_all(&mut engine);

        prop_assert_eq!(removed, plan.len());
        prop_assert!(registry.is_empty());
        prop_assert_eq!(engine.live_count(), 0);
    }

    /// Property: track/untrack keeps keys only while they own handles
    #[test]
    fn untrack_prunes_empty_keys(
        plan in prop::collection::vec(0usize..KEYS.len(), 1..20),
    ) {
        let mut registry = InstanceRegistry::new();
        let tracked: Vec<(EventKey, InstanceId)> = plan
            .iter()
            .enumerate()
            .map(|(i, &key)| (EventKey::parse(KEYS[key]).unwrap(), InstanceId(i as u64 + 1)))
            .collect();
        for (key, id) in &tracked {
            registry.track(key.clone(), *id);
        }
        for (key, id) in &tracked {
            prop_assert!(registry.untrack(key, *id));
            prop_assert!(registry.iter().all(|(_, handles)| !handles.is_empty()));
        }
        prop_assert!(registry.is_empty());
    }
}
