use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::settings::OFF_SCENE_Y;

/// Lifecycle of a dissolving grain. Transitions are one-way; the only
/// re-entry path is an explicit external re-arm back to `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrainState {
    /// Sitting at its initial position above the liquid, not yet released.
    Waiting,
    /// Released and free-falling toward the liquid surface.
    Falling,
    /// Below the surface, descending and dissolving.
    Sinking,
    /// Fully dissolved; excluded from stepping and rendering.
    Removed,
}

/// A point-mass grain owned exclusively by its containing system.
#[derive(Debug, Clone, PartialEq)]
pub struct Grain {
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub age: f32,
    /// Randomized per grain so a batch does not move in lockstep.
    pub delay: f32,
    pub state: GrainState,
    pub opacity: f32,
    pub scale: f32,
    pub initial_position: Point3<f32>,
    /// Horizontal spread direction, fixed when the grain enters the liquid.
    pub radial_dir: Option<Vector3<f32>>,
}

impl Grain {
    pub fn is_active(&self) -> bool {
        self.state != GrainState::Removed
    }
}

/// Per-particle render state published each tick. The renderer owns the
/// mapping of these fields onto its own resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleSnapshot {
    pub position: Point3<f32>,
    pub opacity: f32,
    pub scale: f32,
    pub visible: bool,
}

impl ParticleSnapshot {
    pub fn visible(position: Point3<f32>, opacity: f32, scale: f32) -> Self {
        Self {
            position,
            opacity,
            scale,
            visible: true,
        }
    }

    /// An off-scene placeholder for removed particles.
    pub fn hidden() -> Self {
        Self {
            position: Point3::new(0.0, OFF_SCENE_Y, 0.0),
            opacity: 0.0,
            scale: 0.0,
            visible: false,
        }
    }
}
