//! Sugar-dissolution particle system.
//!
//! A population of grains is held above the liquid, released on an external
//! drop command, free-falls to the surface, then sinks while spreading
//! radially and fading out. When the last grain dissolves the system
//! reports it exactly once. Grain state is a closed enum; transitions are
//! one-way and the only re-entry is an explicit re-arm.

use log::debug;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use crate::particle::{Grain, GrainState, ParticleSnapshot};
use crate::settings::{SugarSettings, MAX_STEP_SECONDS, VEC_LENGTH_THRESHOLD};


/// Grain velocity damping applied once per step while falling.
const FALL_DRAG: f32 = 0.98;
/// Base vertical dissolve rate, scaled up with the sugar amount.
const DISSOLVE_RATE: f32 = 0.08;
/// Base radial spread rate; the spread grows as opacity fades.
const SPREAD_RATE: f32 = 0.06;
/// Base magnitude of the Brownian jitter while sinking.
const DIFFUSION_BASE: f32 = 0.003;
/// Opacity fade rate at amount 1; more sugar fades slower.
const FADE_RATE: f32 = 0.3;
/// Linear shrink rate of a sinking grain.
const SHRINK_RATE: f32 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct DissolveParams {
    pub drop_position: Point3<f32>,
    pub amount: f32,
    pub grains_per_unit: usize,
    pub gravity: f32,
    pub liquid_level: f32,
}

impl DissolveParams {
    pub fn from_settings(settings: &SugarSettings) -> Self {
        Self {
            drop_position: Point3::from(settings.drop_position),
            amount: settings.amount,
            grains_per_unit: settings.grains_per_unit,
            gravity: settings.gravity,
            liquid_level: settings.liquid_level,
        }
    }
}

/// One beaker's worth of dissolving sugar.
#[derive(Debug)]
pub struct DissolveSystem {
    params: DissolveParams,
    grains: Vec<Grain>,
    rng: StdRng,
    /// Random phase so side-by-side beakers don't jitter in lockstep.
    time_offset: f32,
    clock: f32,
    active: bool,
    dissolved_fired: bool,
}

impl DissolveSystem {
    pub fn new(params: DissolveParams, mut rng: StdRng) -> Self {
        let count = (params.grains_per_unit as f32 * params.amount).floor() as usize;
        let time_offset = rng.random_range(0.0..1000.0);

        let grains = (0..count)
            .map(|_| {
                let base = Point3::new(
                    params.drop_position.x + rng.random_range(-0.5..0.5) * 0.2,
                    params.drop_position.y,
                    params.drop_position.z + rng.random_range(-0.5..0.5) * 0.2,
                );
                Grain {
                    position: base,
                    velocity: Self::release_velocity(&mut rng),
                    age: 0.0,
                    delay: rng.random_range(0.0..0.4),
                    state: GrainState::Waiting,
                    opacity: 1.0,
                    scale: rng.random_range(0.5..0.9),
                    initial_position: base,
                    radial_dir: None,
                }
            })
            .collect();

        Self {
            params,
            grains,
            rng,
            time_offset,
            clock: 0.0,
            active: false,
            dissolved_fired: false,
        }
    }

    fn release_velocity(rng: &mut StdRng) -> Vector3<f32> {
        Vector3::new(
            rng.random_range(-0.5..0.5) * 0.05,
            rng.random_range(0.0..1.0) * 0.4 + 0.1,
            rng.random_range(-0.5..0.5) * 0.05,
        )
    }

    pub fn grain_count(&self) -> usize {
        self.grains.len()
    }

    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    pub fn all_removed(&self) -> bool {
        self.grains.iter().all(|g| !g.is_active())
    }

    /// Releases the whole population into free fall with fresh randomized
    /// delays and velocities.
    pub fn pour(&mut self) {
        debug!("pouring {} grains", self.grains.len());
        self.active = true;
        self.dissolved_fired = false;
        for grain in &mut self.grains {
            grain.position = grain.initial_position;
            grain.velocity = Self::release_velocity(&mut self.rng);
            grain.age = 0.0;
            grain.delay = self.rng.random_range(0.0..0.4);
            grain.state = GrainState::Falling;
            grain.radial_dir = None;
            grain.opacity = 1.0;
            grain.scale = self.rng.random_range(0.5..0.9);
        }
    }

    /// Returns every grain to its initial waiting position, ready for the
    /// next spoonful.
    pub fn rearm(&mut self) {
        self.active = false;
        self.dissolved_fired = false;
        for grain in &mut self.grains {
            grain.state = GrainState::Waiting;
            grain.position = grain.initial_position;
            grain.opacity = 1.0;
            grain.scale = self.rng.random_range(0.5..0.9);
            grain.age = 0.0;
            grain.radial_dir = None;
        }
    }

    /// Ends the experiment: everything is removed and no event will fire.
    pub fn finish(&mut self) {
        self.active = false;
        self.dissolved_fired = true;
        for grain in &mut self.grains {
            grain.state = GrainState::Removed;
            grain.opacity = 0.0;
            grain.scale = 0.0;
        }
    }

    /// Advances every grain by one clamped time step. Returns `true` on the
    /// single tick where the last active grain dissolves.
    pub fn step(&mut self, dt: f32) -> bool {
        let dt = dt.min(MAX_STEP_SECONDS);
        if dt <= 0.0 || self.grains.is_empty() {
            return false;
        }
        self.clock += dt;

        if !self.active {
            return false;
        }

        let drop_axis = self.params.drop_position;
        let level = self.params.liquid_level;
        let amount = self.params.amount;
        let local_time = self.clock + self.time_offset;

        for (index, grain) in self.grains.iter_mut().enumerate() {
            match grain.state {
                GrainState::Removed | GrainState::Waiting => continue,
                GrainState::Falling => {
                    grain.age += dt;
                    if grain.age < grain.delay {
                        continue;
                    }

                    grain.velocity.y += self.params.gravity * dt;
                    grain.velocity *= FALL_DRAG;
                    grain.position += grain.velocity * dt;

                    if grain.position.y <= level {
                        grain.position.y = level;
                        grain.state = GrainState::Sinking;
                        grain.age = 0.0;

                        // Fix the spread direction away from the drop axis
                        let mut dir = grain.position - Point3::new(drop_axis.x, level, drop_axis.z);
                        dir.y = 0.0;
                        grain.radial_dir = Some(if dir.norm() > VEC_LENGTH_THRESHOLD {
                            dir.normalize()
                        } else {
                            Vector3::new(
                                self.rng.random_range(-0.5..0.5),
                                0.0,
                                self.rng.random_range(-0.5..0.5),
                            )
                            .normalize()
                        });
                    }
                }
                GrainState::Sinking => {
                    grain.age += dt;

                    // Descend at the dissolve rate; more sugar sinks faster
                    let dissolve_speed = DISSOLVE_RATE * (1.0 + amount * 0.1);
                    grain.position.y -= dissolve_speed * dt;

                    // Radial spread grows as the grain fades
                    let radial_speed = SPREAD_RATE * (1.0 - grain.opacity);
                    if let Some(dir) = grain.radial_dir {
                        grain.position.x += dir.x * radial_speed * dt;
                        grain.position.z += dir.z * radial_speed * dt;
                    }

                    // Brownian jitter, stronger as the grain dissolves
                    let diffusion = DIFFUSION_BASE + (1.0 - grain.opacity) * 0.01;
                    let seed_x = index as f32 * 0.1;
                    let seed_z = index as f32 * 0.15;
                    grain.position.x += (local_time * 10.0 + seed_x).sin() * diffusion * dt;
                    grain.position.z += (local_time * 8.0 + seed_z).cos() * diffusion * dt;

                    let fade_speed = FADE_RATE / amount;
                    grain.opacity = (grain.opacity - fade_speed * dt).max(0.0);
                    grain.scale = (grain.scale - SHRINK_RATE * dt).max(0.0);

                    if grain.opacity <= 0.0 || grain.scale <= 0.0 {
                        grain.state = GrainState::Removed;
                        grain.opacity = 0.0;
                        grain.scale = 0.0;
                    }
                }
            }
        }

        if self.active && !self.dissolved_fired && self.all_removed() {
            self.dissolved_fired = true;
            debug!("all grains dissolved");
            return true;
        }

        false
    }

    /// Render state for every grain, in stable index order.
    pub fn snapshots(&self) -> Vec<ParticleSnapshot> {
        self.grains
            .iter()
            .map(|grain| match grain.state {
                GrainState::Removed => ParticleSnapshot::hidden(),
                GrainState::Waiting => ParticleSnapshot::visible(
                    grain.initial_position,
                    grain.opacity,
                    grain.scale,
                ),
                GrainState::Falling if grain.age < grain.delay => ParticleSnapshot::visible(
                    grain.initial_position,
                    grain.opacity,
                    grain.scale,
                ),
                GrainState::Falling | GrainState::Sinking => {
                    ParticleSnapshot::visible(grain.position, grain.opacity, grain.scale)
                }
            })
            .collect()
    }
}
