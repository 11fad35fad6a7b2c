#![warn(missing_docs)]
//! Test doubles for the audio layer (call-recording engine, scripted emitters)
//! and log capture.

mod emitter;
mod logs;
mod recording;

pub use emitter::TestEmitter;
pub use logs::capture_warnings;
pub use recording::{EngineCall, EngineOp, RecordingEngine, SharedCalls};

/// Tolerance used when comparing bus levels.
pub const VOLUME_EPSILON: f32 = 1e-5;

/// Assert two volumes are equal within [`VOLUME_EPSILON`].
#[track_caller]
pub fn assert_volume(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < VOLUME_EPSILON,
        "volume {actual} != expected {expected}"
    );
}
