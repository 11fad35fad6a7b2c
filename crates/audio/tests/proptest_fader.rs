//! Property-based tests for bus fades
//!
//! Validates:
//! - Ramps follow `lerp(start, target, elapsed / duration)` and end on the target
//! - A superseding fade starts from the level the old ramp reached
//! - Cancelling freezes the level

use proptest::prelude::*;
use soundstage_audio::{AudioBus, BusFader, FadeTask};

fn bus() -> impl Strategy<Value = AudioBus> {
    prop_oneof![
        Just(AudioBus::Master),
        Just(AudioBus::Environment),
        Just(AudioBus::Sfx),
    ]
}

proptest! {
    /// Property: every tick writes the linear interpolation of the elapsed time
    #[test]
    fn ramp_is_linear(
        bus in bus(),
        start in 0.0f32..=1.0,
        target in 0.0f32..=1.0,
        duration in 0.05f32..5.0,
        steps in prop::collection::vec(0.0f32..0.5, 1..40),
    ) {
        let mut fader = BusFader::new();
        fader.begin(bus, start, target, duration);

        let mut elapsed = 0.0f32;
        for dt in steps {
            if !fader.is_fading(bus) {
                break;
            }
            elapsed += dt;
            let mut written = None;
            fader.advance(dt, |b, v| {
                assert_eq!(b, bus);
                written = Some(v);
            });

            let t = (elapsed / duration).clamp(0.0, 1.0);
            let expected = start + (target - start) * t;
            let volume = written.expect("fading bus is written every tick");
            prop_assert!(
                (volume - expected).abs() < 1e-4,
                "volume {} != expected {} at t={}",
                volume,
                expected,
                t
            );
            prop_assert!(volume >= start.min(target) - 1e-5 && volume <= start.max(target) + 1e-5);

            if elapsed >= duration {
                prop_assert_eq!(volume, target);
                prop_assert!(!fader.is_fading(bus));
            }
        }
    }

    /// Property: a task never lingers once its duration has elapsed
    #[test]
    fn completed_tasks_are_removed(
        duration in -1.0f32..2.0,
        target in 0.0f32..=1.0,
    ) {
        let mut fader = BusFader::new();
        fader.begin(AudioBus::Sfx, 0.5, target, duration);
        let mut last = None;
        fader.advance(duration.max(0.0) + 0.01, |_, v| last = Some(v));
        prop_assert_eq!(last, Some(target));
        prop_assert_eq!(fader.active_count(), 0);
    }

    /// Property: superseding a fade keeps a single task and resamples its start
    #[test]
    fn supersession_resamples_start(
        first_target in 0.0f32..=1.0,
        second_target in 0.0f32..=1.0,
        split in 0.05f32..0.95,
    ) {
        let mut fader = BusFader::new();
        fader.begin(AudioBus::Environment, 1.0, first_target, 1.0);
        let mut level = 1.0;
        fader.advance(split, |_, v| level = v);

        let replaced = fader.begin(AudioBus::Environment, level, second_target, 1.0);
        prop_assert!(replaced.is_some());
        prop_assert_eq!(fader.active_count(), 1);

        let task = *fader.task(AudioBus::Environment).expect("new task stored");
        prop_assert_eq!(task, FadeTask::new(level, second_target, 1.0));
        let expected = 1.0 + (first_target - 1.0) * split;
        prop_assert!((task.start - expected).abs() < 1e-4);
    }

    /// Property: cancelling leaves the last written level and stops writes
    #[test]
    fn cancel_freezes_level(
        target in 0.0f32..=1.0,
        before in 0.01f32..0.9,
        after in prop::collection::vec(0.0f32..1.0, 1..10),
    ) {
        let mut fader = BusFader::new();
        fader.begin(AudioBus::Master, 1.0, target, 1.0);
        let mut level = 1.0;
        fader.advance(before, |_, v| level = v);
        let frozen = level;

        prop_assert!(fader.cancel(AudioBus::Master).is_some());
        for dt in after {
            fader.advance(dt, |_, v| level = v);
        }
        prop_assert_eq!(level, frozen);
    }
}
