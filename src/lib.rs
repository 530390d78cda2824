//! labsim: simulation core for interactive science-lab experiments.
//!
//! Two self-contained subsystems back the visual experiments:
//!
//! - the **ray propagation engine** ([`ray`], [`snell`]) computes the
//!   multi-bounce light path through planar mirror and lens surfaces as a
//!   pure function of its declarative inputs;
//! - the **particle motion simulators** ([`dissolve`], [`buoyancy`],
//!   [`sieve`]) are stateful steppers advanced once per displayed frame
//!   with a clamped time step.
//!
//! [`experiment::Experiment`] composes both behind a single `tick`,
//! publishing plain transform/visibility snapshots for the hosting
//! renderer. Rendering, asset loading and UI are external collaborators.

pub mod buoyancy;
pub mod dissolve;
pub mod experiment;
pub mod geom;
pub mod helpers;
pub mod output;
pub mod particle;
pub mod ray;
pub mod resources;
pub mod settings;
pub mod sieve;
pub mod snell;
