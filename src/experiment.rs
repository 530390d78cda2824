//! Experiment orchestration: one tick per displayed frame.
//!
//! An [`Experiment`] owns every stepper plus the declarative ray inputs.
//! Each `tick` advances all particle populations with the same clamped time
//! step and the same gravity/container snapshot, then publishes an immutable
//! [`FrameSnapshot`] for the rendering layer to map onto its own resources.
//! The light path is a pure function of its inputs and is recomputed only
//! when those inputs change, not every frame.

use log::warn;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::buoyancy::BuoyantBody;
use crate::dissolve::{DissolveParams, DissolveSystem};
use crate::geom::Container;
use crate::helpers::make_rng;
use crate::particle::ParticleSnapshot;
use crate::ray::{trace, LensType, LightPath, Ray, Surface, SurfaceKind};
use crate::settings::{Settings, VEC_LENGTH_THRESHOLD};
use crate::sieve::{SieveSystem, TiltControl};


/// Edge-triggered notifications surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    /// The last grain in the given beaker finished dissolving.
    AllDissolved { beaker: usize },
    /// The buoyant body came to rest at its apex height.
    Settled,
    /// Grains fell through the sieve and left the simulation.
    GrainsLost { count: usize },
}

/// Immutable per-frame output. The rendering layer owns the mapping from
/// these fields onto its scene graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub elapsed: f32,
    pub light_path: LightPath,
    /// One population per beaker, in beaker order.
    pub sugar: Vec<Vec<ParticleSnapshot>>,
    pub body: ParticleSnapshot,
    pub grains: Vec<ParticleSnapshot>,
    pub events: Vec<Event>,
}

/// The full interactive experiment: optical bench plus the three particle
/// systems, advanced one tick per displayed frame.
#[derive(Debug)]
pub struct Experiment {
    settings: Settings,

    ray: Ray,
    surfaces: Vec<Surface>,
    light_path: LightPath,
    path_dirty: bool,

    beakers: Vec<DissolveSystem>,
    body: BuoyantBody,
    sieve: SieveSystem,
    tilt: TiltControl,

    elapsed: f32,
}

impl Experiment {
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed;

        let beakers = (0..settings.sugar.beakers)
            .map(|i| {
                DissolveSystem::new(
                    DissolveParams::from_settings(&settings.sugar),
                    make_rng(seed, i as u64),
                )
            })
            .collect();

        let container = Container::from_settings(&settings.beaker);
        let body = BuoyantBody::new(&settings.body, container, make_rng(seed, 100));
        let sieve = SieveSystem::new(settings.sieve.clone(), make_rng(seed, 200));
        let tilt = TiltControl::new(&settings.sieve);

        let ray = Ray::new(
            Point3::from(settings.ray.origin),
            Vector3::from(settings.ray.direction).normalize(),
            settings.ray.length,
        );

        let mut experiment = Self {
            settings,
            ray,
            surfaces: Vec::new(),
            light_path: LightPath::default(),
            path_dirty: true,
            beakers,
            body,
            sieve,
            tilt,
            elapsed: 0.0,
        };
        experiment.retrace();
        experiment
    }

    fn retrace(&mut self) {
        self.light_path = trace(
            &self.ray,
            &self.surfaces,
            self.settings.ray.max_depth,
            self.settings.ray.focal_length,
        );
        self.path_dirty = false;
    }

    /// Replaces the optical surfaces. The path is retraced on the next tick.
    pub fn set_surfaces(&mut self, surfaces: Vec<Surface>) {
        self.surfaces = surfaces;
        self.path_dirty = true;
    }

    /// Replaces the ray source. The direction is normalized here; a
    /// degenerate direction is rejected and the previous ray kept.
    pub fn set_ray(&mut self, origin: Point3<f32>, direction: Vector3<f32>, length: f32) {
        if direction.norm() < VEC_LENGTH_THRESHOLD {
            warn!("ignoring degenerate ray direction {:?}", direction);
            return;
        }
        self.ray = Ray::new(origin, direction.normalize(), length);
        self.path_dirty = true;
    }

    /// Switches every lens surface to the given lens type, as the UI mode
    /// toggle does.
    pub fn set_lens_type(&mut self, lens_type: Option<LensType>) {
        for surface in &mut self.surfaces {
            if let SurfaceKind::Lens {
                lens_type: current, ..
            } = &mut surface.kind
            {
                *current = lens_type;
            }
        }
        self.path_dirty = true;
    }

    /// Releases every beaker's sugar population.
    pub fn pour_sugar(&mut self) {
        for beaker in &mut self.beakers {
            beaker.pour();
        }
    }

    /// Returns every beaker to its armed waiting state.
    pub fn rearm_sugar(&mut self) {
        for beaker in &mut self.beakers {
            beaker.rearm();
        }
    }

    /// Drops the buoyant body into the beaker.
    pub fn drop_body(&mut self) {
        self.body.release();
    }

    /// Updates the dissolved-sugar concentration as a live input: the body
    /// keeps its position, velocity and phase and only the forces change.
    pub fn set_concentration(&mut self, concentration: f32) {
        self.settings.body.concentration = concentration;
        self.body.set_concentration(concentration);
    }

    /// Spawns a batch of sieve grains.
    pub fn spawn_grains(&mut self) {
        self.sieve.spawn_batch();
    }

    pub fn tilt_begin(&mut self) {
        self.tilt.begin_drag();
    }

    pub fn tilt_drag(&mut self, delta_x: f32, delta_y: f32) {
        self.tilt.drag(delta_x, delta_y);
    }

    pub fn tilt_end(&mut self) {
        self.tilt.end_drag();
    }

    /// Clears all state synchronously before the next tick.
    pub fn reset(&mut self) {
        self.rearm_sugar();
        self.body.reset();
        self.sieve.clear();
        self.tilt.reset();
        self.elapsed = 0.0;
    }

    /// Advances every subsystem by one clamped time step and publishes the
    /// frame snapshot. All populations see the same step and the same tilt
    /// gravity.
    pub fn tick(&mut self, dt: f32) -> FrameSnapshot {
        let dt = dt.clamp(0.0, crate::settings::MAX_STEP_SECONDS);
        self.elapsed += dt;

        let mut events = Vec::new();
        let gravity = self.tilt.gravity();

        for (index, beaker) in self.beakers.iter_mut().enumerate() {
            if beaker.step(dt) {
                events.push(Event::AllDissolved { beaker: index });
            }
        }
        if self.body.step(dt) {
            events.push(Event::Settled);
        }
        let lost = self.sieve.step(dt, &gravity);
        if lost > 0 {
            events.push(Event::GrainsLost { count: lost });
        }

        if self.path_dirty {
            self.retrace();
        }

        FrameSnapshot {
            elapsed: self.elapsed,
            light_path: self.light_path.clone(),
            sugar: self.beakers.iter().map(DissolveSystem::snapshots).collect(),
            body: self.body.snapshot(),
            grains: self.sieve.snapshots(),
            events,
        }
    }
}
