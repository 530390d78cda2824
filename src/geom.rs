use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::settings::{BeakerSettings, VEC_LENGTH_THRESHOLD};


/// A cylindrical container with a liquid surface. Particle positions are
/// tested against it every step for wall reflection and floor rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub centre: Point3<f32>,
    pub radius: f32,
    /// Depth of the floor below the centre.
    pub floor_depth: f32,
    /// Height of the liquid surface above the centre.
    pub liquid_level: f32,
}

impl Container {
    pub fn new(centre: Point3<f32>, radius: f32, floor_depth: f32, liquid_level: f32) -> Self {
        Self {
            centre,
            radius,
            floor_depth,
            liquid_level,
        }
    }

    pub fn from_settings(settings: &BeakerSettings) -> Self {
        Self::new(
            Point3::from(settings.centre),
            settings.radius,
            settings.floor_depth,
            settings.liquid_level,
        )
    }

    /// Absolute height of the liquid surface.
    pub fn surface_y(&self) -> f32 {
        self.centre.y + self.liquid_level
    }

    /// Resting height for a body of the given radius sitting on the floor.
    pub fn floor_level(&self, body_radius: f32) -> f32 {
        self.centre.y - self.floor_depth + body_radius
    }

    /// Horizontal distance from the central axis.
    pub fn radial_distance(&self, position: &Point3<f32>) -> f32 {
        let dx = position.x - self.centre.x;
        let dz = position.z - self.centre.z;
        dx.hypot(dz)
    }

    /// Outward horizontal unit normal and distance from the axis, or `None`
    /// when the position sits too close to the axis to define one.
    pub fn radial_offset(&self, position: &Point3<f32>) -> Option<(Vector3<f32>, f32)> {
        let dx = position.x - self.centre.x;
        let dz = position.z - self.centre.z;
        let dist = dx.hypot(dz);
        if dist < VEC_LENGTH_THRESHOLD {
            return None;
        }
        Some((Vector3::new(dx / dist, 0.0, dz / dist), dist))
    }

    /// Whether the position lies within the container radius, shrunk by the
    /// given margin.
    pub fn contains_radially(&self, position: &Point3<f32>, margin: f32) -> bool {
        self.radial_distance(position) < self.radius - margin
    }

    /// Whether a body of the given radius is submerged: inside the radius
    /// (with a half-radius margin) and at or below the liquid surface.
    pub fn in_liquid(&self, position: &Point3<f32>, body_radius: f32) -> bool {
        let inside = self.contains_radially(position, body_radius * 0.5);
        let below = position.y <= self.surface_y() - body_radius * 0.5;
        inside && below
    }
}
