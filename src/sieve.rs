//! Granular sieve experiment: batch spawning, lost-grain culling and the
//! tilt controller that turns a drag gesture into an effective gravity
//! vector.
//!
//! Rigid-body contact between grains and the sieve mesh is the host physics
//! engine's job. This module owns the surrounding scene logic: spawning
//! batches with randomized sizes and positions above the container, dropping
//! grains that fall below the lost threshold, and the bounded
//! tilt-to-gravity mapping that makes grains roll toward the lower side. A
//! plain ballistic step is provided so headless runs still move grains under
//! the current gravity.

use log::debug;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use crate::particle::ParticleSnapshot;
use crate::settings::{SieveSettings, MAX_STEP_SECONDS};


/// A free grain awaiting external rigid-body integration.
#[derive(Debug, Clone, PartialEq)]
pub struct SieveGrain {
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub radius: f32,
}

#[derive(Debug)]
pub struct SieveSystem {
    settings: SieveSettings,
    grains: Vec<SieveGrain>,
    rng: StdRng,
}

impl SieveSystem {
    pub fn new(settings: SieveSettings, rng: StdRng) -> Self {
        Self {
            settings,
            grains: Vec::new(),
            rng,
        }
    }

    pub fn grains(&self) -> &[SieveGrain] {
        &self.grains
    }

    /// Spawns one batch of grains with randomized radii and positions above
    /// the container.
    pub fn spawn_batch(&mut self) {
        let half_extent = self.settings.spawn_extent / 2.0;
        for _ in 0..self.settings.batch_size {
            let radius = self.settings.grain_radii
                [self.rng.random_range(0..self.settings.grain_radii.len())];
            let position = Point3::new(
                self.rng.random_range(-half_extent..half_extent),
                self.settings.spawn_height
                    + self.rng.random_range(0.0..self.settings.spawn_height_span),
                self.rng.random_range(-half_extent..half_extent),
            );
            self.grains.push(SieveGrain {
                position,
                velocity: Vector3::zeros(),
                radius,
            });
        }
        debug!("spawned batch, {} grains total", self.grains.len());
    }

    /// Ballistic fallback step under the supplied gravity, then culls
    /// grains below the lost threshold. Returns how many grains were lost
    /// this step. Every grain sees the same gravity snapshot.
    pub fn step(&mut self, dt: f32, gravity: &Vector3<f32>) -> usize {
        let dt = dt.min(MAX_STEP_SECONDS);
        if dt <= 0.0 {
            return 0;
        }

        for grain in &mut self.grains {
            grain.velocity += gravity * dt;
            grain.position += grain.velocity * dt;
        }

        let before = self.grains.len();
        let threshold = self.settings.lost_threshold;
        self.grains.retain(|g| g.position.y > threshold);
        before - self.grains.len()
    }

    pub fn clear(&mut self) {
        self.grains.clear();
    }

    pub fn snapshots(&self) -> Vec<ParticleSnapshot> {
        self.grains
            .iter()
            .map(|g| ParticleSnapshot::visible(g.position, 1.0, g.radius * 2.0))
            .collect()
    }
}

/// Maps a 2D drag gesture onto a bounded container rotation and recomputes
/// the effective gravity by tilting the world-down vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TiltControl {
    rotation_x: f32,
    rotation_z: f32,
    start_x: f32,
    start_z: f32,
    limit: f32,
    sensitivity: f32,
    gravity_magnitude: f32,
}

impl TiltControl {
    pub fn new(settings: &SieveSettings) -> Self {
        Self {
            rotation_x: 0.0,
            rotation_z: 0.0,
            start_x: 0.0,
            start_z: 0.0,
            limit: settings.tilt_limit,
            sensitivity: settings.tilt_sensitivity,
            gravity_magnitude: settings.gravity_magnitude,
        }
    }

    pub fn rotation_x(&self) -> f32 {
        self.rotation_x
    }

    pub fn rotation_z(&self) -> f32 {
        self.rotation_z
    }

    /// Records the rotation held at the start of a drag so the gesture
    /// composes with it.
    pub fn begin_drag(&mut self) {
        self.start_x = self.rotation_x;
        self.start_z = self.rotation_z;
    }

    /// Applies a drag delta in normalized screen coordinates.
    pub fn drag(&mut self, delta_x: f32, delta_y: f32) {
        let z = self.start_z + delta_x * self.sensitivity;
        let x = self.start_x - delta_y * self.sensitivity;
        self.rotation_z = z.clamp(-self.limit, self.limit);
        self.rotation_x = x.clamp(-self.limit, self.limit);
    }

    pub fn end_drag(&mut self) {
        self.start_x = self.rotation_x;
        self.start_z = self.rotation_z;
    }

    pub fn reset(&mut self) {
        self.rotation_x = 0.0;
        self.rotation_z = 0.0;
        self.start_x = 0.0;
        self.start_z = 0.0;
    }

    /// Effective gravity under the current tilt. Tipping the container to
    /// the right (+z rotation) pulls grains toward -x; tipping it forward
    /// (-x rotation) pulls them toward -z.
    pub fn gravity(&self) -> Vector3<f32> {
        let g = self.gravity_magnitude;
        let gx = -self.rotation_z.sin() * g;
        let gz = self.rotation_x.sin() * g;
        let total_angle = (self.rotation_x * self.rotation_x
            + self.rotation_z * self.rotation_z)
            .sqrt();
        let gy = -g * total_angle.cos();
        Vector3::new(gx, gy, gz)
    }
}
