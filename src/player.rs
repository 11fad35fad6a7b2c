//! Character movement and footstep detection.

use crate::config::PlayerConfig;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Surface under the player, forwarded to footstep events as `ground_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundType {
    #[default]
    Grass,
    Gravel,
    Wood,
    Stone,
    Water,
}

impl GroundType {
    /// Name of the engine parameter footsteps carry.
    pub const PARAMETER: &'static str = "ground_type";

    /// Value written to the `ground_type` parameter.
    pub fn parameter_value(self) -> f32 {
        match self {
            GroundType::Grass => 0.0,
            GroundType::Gravel => 1.0,
            GroundType::Wood => 2.0,
            GroundType::Stone => 3.0,
            GroundType::Water => 4.0,
        }
    }
}

/// Axis-aligned patch of ground on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GroundRegion {
    pub min: [f32; 2],
    pub max: [f32; 2],
    pub ground: GroundType,
}

impl GroundRegion {
    fn contains(&self, position: Vec3) -> bool {
        position.x >= self.min[0]
            && position.x <= self.max[0]
            && position.z >= self.min[1]
            && position.z <= self.max[1]
    }
}

/// Ground lookup; the first matching region wins.
#[derive(Debug, Clone, Default)]
pub struct GroundMap {
    fallback: GroundType,
    regions: Vec<GroundRegion>,
}

impl GroundMap {
    pub fn new(fallback: GroundType, regions: Vec<GroundRegion>) -> Self {
        Self { fallback, regions }
    }

    pub fn ground_at(&self, position: Vec3) -> GroundType {
        self.regions
            .iter()
            .find(|region| region.contains(position))
            .map_or(self.fallback, |region| region.ground)
    }
}

/// Horizontal movement input, each axis in `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveInput {
    pub move_x: f32,
    pub move_z: f32,
}

impl MoveInput {
    pub fn new(move_x: f32, move_z: f32) -> Self {
        Self { move_x, move_z }
    }
}

/// A footstep landed at `position` on `ground`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footstep {
    pub position: Vec3,
    pub ground: GroundType,
}

/// Fixed-step character controller.
#[derive(Debug, Clone)]
pub struct PlayerController {
    position: Vec3,
    velocity: Vec3,
    speed: f32,
    stride: f32,
    travelled: f32,
    ground: GroundMap,
}

impl PlayerController {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            speed: config.speed.max(0.0),
            stride: config.stride,
            travelled: 0.0,
            ground: GroundMap::new(config.ground, config.regions.clone()),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Move for one fixed step and report a footstep once a stride is covered.
    pub fn fixed_update(&mut self, input: MoveInput, dt: f32) -> Option<Footstep> {
        let direction = Vec3::new(
            input.move_x.clamp(-1.0, 1.0),
            0.0,
            input.move_z.clamp(-1.0, 1.0),
        );
        self.velocity = direction * self.speed;
        let step = self.velocity * dt.max(0.0);
        self.position += step;

        if self.stride <= 0.0 {
            return None;
        }
        self.travelled += step.length();
        if self.travelled < self.stride {
            return None;
        }
        // At most one footstep per tick.
        self.travelled %= self.stride;
        Some(Footstep {
            position: self.position,
            ground: self.ground.ground_at(self.position),
        })
    }
}
