//! Per-bus linear volume ramps.
//!
//! Each bus has at most one [`FadeTask`]. Starting a fade replaces the
//! previous task before the new one is stored, so two ramps never write the
//! same bus. Cancelling is removal: the bus keeps whatever level the ramp last
//! wrote.

use crate::bus::AudioBus;
use std::collections::HashMap;

/// One in-flight ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeTask {
    /// Bus level sampled when the fade began.
    pub start: f32,
    /// Level reached at `duration`.
    pub target: f32,
    /// Ramp length in seconds.
    pub duration: f32,
    /// Seconds advanced so far.
    pub elapsed: f32,
}

impl FadeTask {
    /// Fresh ramp from `start` to `target`.
    pub fn new(start: f32, target: f32, duration: f32) -> Self {
        Self {
            start,
            target,
            duration,
            elapsed: 0.0,
        }
    }

    /// Elapsed fraction clamped to `[0, 1]`. Non-positive durations are complete.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Level at the current elapsed time.
    pub fn volume(&self) -> f32 {
        let t = self.progress();
        if t >= 1.0 {
            return self.target;
        }
        self.start + (self.target - self.start) * t
    }

    /// Whether the ramp reached its duration.
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Bus → current fade.
#[derive(Debug, Default)]
pub struct BusFader {
    fades: HashMap<AudioBus, FadeTask>,
}

impl BusFader {
    /// No fades in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a ramp on `bus`, returning the task it superseded.
    pub fn begin(
        &mut self,
        bus: AudioBus,
        start: f32,
        target: f32,
        duration: f32,
    ) -> Option<FadeTask> {
        let previous = self.fades.remove(&bus);
        self.fades.insert(bus, FadeTask::new(start, target, duration));
        previous
    }

    /// Drop the ramp on `bus`.
    pub fn cancel(&mut self, bus: AudioBus) -> Option<FadeTask> {
        self.fades.remove(&bus)
    }

    /// Drop every ramp, returning how many were in flight.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.fades.len();
        self.fades.clear();
        count
    }

    /// Whether `bus` has a ramp in flight.
    pub fn is_fading(&self, bus: AudioBus) -> bool {
        self.fades.contains_key(&bus)
    }

    /// In-flight ramp on `bus`.
    pub fn task(&self, bus: AudioBus) -> Option<&FadeTask> {
        self.fades.get(&bus)
    }

    /// Number of ramps in flight.
    pub fn active_count(&self) -> usize {
        self.fades.len()
    }

    /// Advance every ramp by `dt`, handing each new level to `apply`.
    ///
    /// Ramps that reach their duration write the target and are removed.
    pub fn advance<F>(&mut self, dt: f32, mut apply: F)
    where
        F: FnMut(AudioBus, f32),
    {
        self.fades.retain(|&bus, task| {
            task.elapsed += dt;
            apply(bus, task.volume());
            !task.is_complete()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn ramp_is_linear_then_stops() {
        let mut fader = BusFader::new();
        fader.begin(AudioBus::Sfx, 1.0, 0.0, 2.0);

        let mut last = None;
        fader.advance(0.5, |_, v| last = Some(v));
        assert!(close(last.unwrap(), 0.75));
        fader.advance(1.0, |_, v| last = Some(v));
        assert!(close(last.unwrap(), 0.25));
        fader.advance(1.0, |_, v| last = Some(v));
        assert!(close(last.unwrap(), 0.0));
        assert!(!fader.is_fading(AudioBus::Sfx));

        last = None;
        fader.advance(1.0, |_, v| last = Some(v));
        assert!(last.is_none());
    }

    #[test]
    fn zero_duration_jumps_on_next_advance() {
        let mut fader = BusFader::new();
        fader.begin(AudioBus::Master, 0.2, 0.9, 0.0);
        let mut writes = Vec::new();
        fader.advance(0.016, |bus, v| writes.push((bus, v)));
        assert_eq!(writes, vec![(AudioBus::Master, 0.9)]);
        assert_eq!(fader.active_count(), 0);
    }

    #[test]
    fn begin_replaces_previous_task() {
        let mut fader = BusFader::new();
        assert!(fader.begin(AudioBus::Environment, 1.0, 0.0, 4.0).is_none());
        let old = fader
            .begin(AudioBus::Environment, 0.5, 1.0, 1.0)
            .expect("first fade superseded");
        assert_eq!(old.target, 0.0);
        let task = fader.task(AudioBus::Environment).unwrap();
        assert_eq!(task.start, 0.5);
        assert_eq!(task.elapsed, 0.0);
    }

    #[test]
    fn cancel_only_touches_one_bus() {
        let mut fader = BusFader::new();
        fader.begin(AudioBus::Sfx, 1.0, 0.0, 1.0);
        fader.begin(AudioBus::Master, 1.0, 0.0, 1.0);
        assert!(fader.cancel(AudioBus::Sfx).is_some());
        assert!(fader.cancel(AudioBus::Sfx).is_none());
        assert!(fader.is_fading(AudioBus::Master));
        assert_eq!(fader.cancel_all(), 1);
    }
}
