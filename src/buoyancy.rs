//! Buoyant-body integrator for the sugar-concentration experiment.
//!
//! A single body (a cherry tomato, in the classroom version) is dropped
//! into a beaker of liquid whose density rises with the dissolved-sugar
//! concentration. While submerged it feels gravity plus a buoyancy force
//! proportional to the density difference, so enough dissolved sugar makes
//! the body float. Above a concentration threshold a floor contact launches
//! a spring-damped ascent toward an apex height, where the body settles.

use log::debug;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use crate::geom::Container;
use crate::particle::ParticleSnapshot;
use crate::settings::{BodySettings, MAX_STEP_SECONDS, REST_TOLERANCE};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::make_rng;
    use approx::assert_relative_eq;

    fn settings(concentration: f32) -> BodySettings {
        BodySettings {
            start_position: [0.0, 2.0, 0.0],
            radius: 0.12,
            density: 0.95,
            concentration,
            gravity: -1.5,
            water_drag: 0.92,
            air_drag: 0.99,
            restitution: 0.3,
            buoyancy_factor: 3.5,
            rise_threshold: 20.0,
            rise_speed: 1.2,
            spring_stiffness: 20.0,
            spring_damping: 5.0,
            apex: None,
        }
    }

    fn beaker() -> Container {
        Container::new(Point3::new(0.0, -0.6, 0.0), 0.32, 0.25, 0.56)
    }

    fn body(concentration: f32) -> BuoyantBody {
        BuoyantBody::new(&settings(concentration), beaker(), make_rng(Some(3), 0))
    }

    #[test]
    fn held_body_does_not_move() {
        let mut b = body(0.0);
        for _ in 0..10 {
            b.step(1.0 / 60.0);
        }
        assert_eq!(b.position(), Point3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn low_concentration_body_sinks_to_floor() {
        let mut b = body(0.0);
        b.release();
        for _ in 0..3000 {
            b.step(1.0 / 60.0);
        }
        let floor = beaker().floor_level(0.12);
        assert!(b.position().y < floor + 0.05, "y = {}", b.position().y);
        assert_eq!(b.phase(), BodyPhase::Free);
    }

    #[test]
    fn rest_on_floor_is_idempotent() {
        let mut b = body(0.0);
        b.release();
        for _ in 0..3000 {
            b.step(1.0 / 60.0);
        }
        let settled = b.position();
        for _ in 0..300 {
            b.step(1.0 / 60.0);
        }
        assert_relative_eq!(b.position().y, settled.y, epsilon = 1e-3);
    }

    #[test]
    fn high_concentration_body_settles_at_apex() {
        let mut b = body(30.0);
        b.release();
        let mut settled_events = 0;
        for _ in 0..6000 {
            if b.step(1.0 / 60.0) {
                settled_events += 1;
            }
        }
        assert_eq!(b.phase(), BodyPhase::Settled);
        assert_eq!(settled_events, 1);
        assert_relative_eq!(b.position().y, 2.0, epsilon = 1e-2);
    }

    #[test]
    fn higher_concentration_rises_no_slower() {
        // Two bodies start submerged at rest, deep in the beaker; at these
        // concentrations the liquid is denser than the body, so buoyancy
        // alone drives the ascent. The denser liquid must reach the target
        // height in fewer or equal ticks.
        let target = -0.15;
        let mut ticks = Vec::new();
        for concentration in [100.0, 150.0] {
            let mut b = body(concentration);
            b.release();
            b.place(Point3::new(0.0, -0.6, 0.0));
            let mut n = 0u32;
            while b.position().y < target && n < 100_000 {
                b.step(1.0 / 60.0);
                n += 1;
            }
            ticks.push(n);
        }
        assert!(ticks[1] <= ticks[0], "ticks: {:?}", ticks);
        assert!(ticks[1] < 100_000);
    }

    #[test]
    fn concentration_change_lifts_a_resting_body() {
        let mut b = body(0.0);
        b.release();
        for _ in 0..3000 {
            b.step(1.0 / 60.0);
        }
        let resting = b.position();
        assert!(resting.y < -0.6, "y = {}", resting.y);

        // Adding sugar while the body rests must not move or re-hold it
        b.set_concentration(30.0);
        assert_eq!(b.position(), resting);
        assert_eq!(b.phase(), BodyPhase::Free);

        let mut settled_events = 0;
        for _ in 0..6000 {
            if b.step(1.0 / 60.0) {
                settled_events += 1;
            }
        }
        assert_eq!(b.phase(), BodyPhase::Settled);
        assert_eq!(settled_events, 1);
    }

    #[test]
    fn oversized_step_matches_clamp_ceiling() {
        let mut a = body(0.0);
        let mut b = body(0.0);
        a.release();
        b.release();
        a.step(2.0);
        b.step(MAX_STEP_SECONDS);
        assert_eq!(a.position(), b.position());
        assert_eq!(a.velocity(), b.velocity());
    }

    #[test]
    fn reset_returns_to_held_start() {
        let mut b = body(0.0);
        b.release();
        for _ in 0..600 {
            b.step(1.0 / 60.0);
        }
        b.reset();
        assert_eq!(b.phase(), BodyPhase::Held);
        assert_eq!(b.position(), Point3::new(0.0, 2.0, 0.0));
        assert_eq!(b.velocity(), Vector3::zeros());
    }

    #[test]
    fn wall_collision_keeps_body_inside() {
        let mut b = body(0.0);
        b.release();
        for _ in 0..6000 {
            b.step(1.0 / 60.0);
            let dist = beaker().radial_distance(&b.position());
            assert!(dist <= 0.32 - 0.12 + 1e-4, "dist = {}", dist);
        }
    }
}

/// Lifecycle of the buoyant body. One-way except for an external reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPhase {
    /// Pinned at the start position, waiting for the drop command.
    Held,
    /// Free integration under gravity, buoyancy and drag.
    Free,
    /// Spring-damped ascent toward the apex height.
    Rising,
    /// Pinned at the apex; stepping is a no-op.
    Settled,
}

/// A single buoyant body in a liquid-filled container.
#[derive(Debug)]
pub struct BuoyantBody {
    start_position: Point3<f32>,
    radius: f32,
    gravity: f32,
    water_drag: f32,
    air_drag: f32,
    restitution: f32,
    density: f32,
    buoyancy_factor: f32,
    /// Net upward acceleration while submerged; recomputed whenever the
    /// concentration changes.
    buoyancy: f32,
    rise_threshold: f32,
    rise_speed: f32,
    spring_stiffness: f32,
    spring_damping: f32,
    concentration: f32,
    apex_y: f32,
    container: Container,
    rng: StdRng,

    position: Point3<f32>,
    velocity: Vector3<f32>,
    phase: BodyPhase,
    settled_fired: bool,
}

impl BuoyantBody {
    pub fn new(settings: &BodySettings, container: Container, rng: StdRng) -> Self {
        let start_position = Point3::from(settings.start_position);
        let apex_y = settings.apex.unwrap_or(start_position.y);
        let mut body = Self {
            start_position,
            radius: settings.radius,
            gravity: settings.gravity,
            water_drag: settings.water_drag,
            air_drag: settings.air_drag,
            restitution: settings.restitution,
            density: settings.density,
            buoyancy_factor: settings.buoyancy_factor,
            buoyancy: 0.0,
            rise_threshold: settings.rise_threshold,
            rise_speed: settings.rise_speed,
            spring_stiffness: settings.spring_stiffness,
            spring_damping: settings.spring_damping,
            concentration: settings.concentration,
            apex_y,
            container,
            rng,
            position: start_position,
            velocity: Vector3::zeros(),
            phase: BodyPhase::Held,
            settled_fired: false,
        };
        body.buoyancy = body.buoyancy_force();
        body
    }

    /// Buoyancy from the density difference; dissolved sugar raises the
    /// liquid density by 0.004 per unit of concentration.
    fn buoyancy_force(&self) -> f32 {
        let liquid_density = 1.0 + self.concentration * 0.004;
        (liquid_density - self.density) * self.buoyancy_factor
    }

    /// Updates the dissolved-sugar concentration of the surrounding liquid.
    /// The concentration is a live input: position, velocity and phase are
    /// untouched, so a body resting on the floor starts its ascent on the
    /// next floor contact once the threshold is passed.
    pub fn set_concentration(&mut self, concentration: f32) {
        self.concentration = concentration;
        self.buoyancy = self.buoyancy_force();
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn phase(&self) -> BodyPhase {
        self.phase
    }

    /// Overrides the body position. Used to stage scenarios (e.g. starting
    /// submerged) without replaying the fall.
    pub fn place(&mut self, position: Point3<f32>) {
        self.position = position;
        self.velocity = Vector3::zeros();
    }

    /// Drops the body from the start position with a small random lateral
    /// kick so repeated drops don't look identical.
    pub fn release(&mut self) {
        if self.phase != BodyPhase::Held {
            return;
        }
        self.position = self.start_position;
        self.velocity = Vector3::new(self.rng.random_range(-0.5..0.5) * 0.3, -0.5, 0.03);
        self.phase = BodyPhase::Free;
        debug!("body released at {:?}", self.position);
    }

    /// Returns the body to its held start state.
    pub fn reset(&mut self) {
        self.phase = BodyPhase::Held;
        self.position = self.start_position;
        self.velocity = Vector3::zeros();
        self.settled_fired = false;
    }

    /// Advances the body by one clamped time step. Returns `true` on the
    /// single tick where the body settles at its apex.
    pub fn step(&mut self, dt: f32) -> bool {
        let dt = dt.min(MAX_STEP_SECONDS);
        if dt <= 0.0 {
            return false;
        }

        match self.phase {
            BodyPhase::Held | BodyPhase::Settled => false,
            BodyPhase::Rising => self.step_rising(dt),
            BodyPhase::Free => {
                self.step_free(dt);
                false
            }
        }
    }

    /// Spring-damped ascent: `v_y += (k (apex - y) - c v_y) dt`, pinned once
    /// displacement and velocity both fall under tolerance.
    fn step_rising(&mut self, dt: f32) -> bool {
        let displacement = self.apex_y - self.position.y;
        let spring = self.spring_stiffness * displacement;
        let damping = -self.spring_damping * self.velocity.y;

        self.velocity.y += (spring + damping) * dt;
        self.position.y += self.velocity.y * dt;

        if displacement.abs() < REST_TOLERANCE && self.velocity.y.abs() < REST_TOLERANCE {
            self.position.y = self.apex_y;
            self.velocity.y = 0.0;
            self.phase = BodyPhase::Settled;
            if !self.settled_fired {
                self.settled_fired = true;
                debug!("body settled at apex {}", self.apex_y);
                return true;
            }
        }
        false
    }

    fn step_free(&mut self, dt: f32) {
        let in_liquid = self.container.in_liquid(&self.position, self.radius);

        if in_liquid {
            self.velocity.y += (self.gravity + self.buoyancy) * dt;
            self.velocity *= self.water_drag;
        } else {
            self.velocity.y += self.gravity * dt;
            self.velocity *= self.air_drag;
        }

        self.position += self.velocity * dt;

        // Wall collision: clamp to the boundary and reflect the outward
        // radial velocity component with restitution
        let effective_radius = self.container.radius - self.radius;
        if let Some((normal, dist)) = self.container.radial_offset(&self.position) {
            if dist > effective_radius {
                self.position.x = self.container.centre.x + normal.x * effective_radius * 0.9;
                self.position.z = self.container.centre.z + normal.z * effective_radius * 0.9;
                let radial_vel = self.velocity.x * normal.x + self.velocity.z * normal.z;
                if radial_vel > 0.0 {
                    self.velocity.x -= normal.x * radial_vel * (1.0 + self.restitution);
                    self.velocity.z -= normal.z * radial_vel * (1.0 + self.restitution);
                }
            }
        }

        // Floor collision, and the rise trigger at high concentration
        if self.container.radial_distance(&self.position) < self.container.radius {
            let floor_y = self.container.floor_level(self.radius);
            if self.position.y < floor_y {
                self.position.y = floor_y;
                self.velocity.y = self.velocity.y.abs() * self.restitution;

                if self.concentration > self.rise_threshold {
                    self.phase = BodyPhase::Rising;
                    self.velocity.y = self.rise_speed;
                    debug!("rise triggered at concentration {}", self.concentration);
                    return;
                }
            }
        }

        // Rescue clamps against runaway integration
        if self.position.y < self.container.centre.y - 1.0 {
            self.position.y = self.container.floor_level(self.radius);
            self.velocity.y = 0.0;
        }
        let from_origin = self.position.coords.norm();
        if from_origin > 3.0 {
            self.position = Point3::from(self.position.coords.normalize() * 3.0);
            self.velocity = Vector3::zeros();
        }
        let ceiling = self.start_position.y + 0.5;
        if self.position.y > ceiling {
            self.position.y = ceiling;
            self.velocity.y = self.velocity.y.min(0.0);
        }
    }

    pub fn snapshot(&self) -> ParticleSnapshot {
        ParticleSnapshot::visible(self.position, 1.0, 1.0)
    }
}
