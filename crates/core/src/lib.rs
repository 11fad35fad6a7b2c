#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod key;
pub mod path;

use serde::{Deserialize, Serialize};

pub use key::{EventKey, EventKeyError, DEFAULT_NAMESPACE};
pub use path::{AudioPath, AudioPathError, PathKind};

/// Fixed tick counter for the host frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Real-time interval timer driven by frame deltas.
///
/// Accumulates `dt` and fires once the accumulator exceeds the interval, then
/// resets to zero (leftover time is discarded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTimer {
    interval: f32,
    elapsed: f32,
}

impl IntervalTimer {
    /// Create a timer firing every `interval` seconds.
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Interval in seconds.
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Seconds accumulated since the last firing.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance by `dt` seconds, returning `true` when the interval elapsed.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt.max(0.0);
        if self.elapsed > self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    /// Restart the interval from zero.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}
