use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use nalgebra::Point3;
use serde::Deserialize;
use std::env;
use std::fmt;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_use_double_underscore_throughout() {
        std::env::set_var("LABSIM__RAY__MAX_DEPTH", "7");
        let root = retrieve_project_root();
        let config = Config::builder()
            .add_source(File::from(root.join("config/default.toml")).required(true))
            .add_source(environment_source())
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();
        std::env::remove_var("LABSIM__RAY__MAX_DEPTH");
        assert_eq!(settings.ray.max_depth, 7);
    }
}

/// Minimum absolute value of a ray/plane denominator before the ray is
/// treated as parallel to the plane and the surface is skipped.
pub const PLANE_EPSILON: f32 = 1e-6;
/// Minimum vector length (in scene units) to be considered non-degenerate.
pub const VEC_LENGTH_THRESHOLD: f32 = 0.01;
/// Maximum time step fed to any integrator. Larger frame gaps (tab
/// backgrounding, debugger pauses) are clamped to this value.
pub const MAX_STEP_SECONDS: f32 = 1.0 / 30.0;
/// Displacement and velocity tolerance below which a spring-driven body is
/// pinned at its target height.
pub const REST_TOLERANCE: f32 = 0.01;
/// Vertical placement for snapshot entries that must not be rendered.
pub const OFF_SCENE_Y: f32 = -100.0;

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub ray: RaySettings,
    pub beaker: BeakerSettings,
    pub sugar: SugarSettings,
    pub body: BodySettings,
    pub sieve: SieveSettings,
    pub run: RunSettings,
    pub seed: Option<u64>,
}

/// Declarative inputs for the optical bench scene.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RaySettings {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub max_depth: i32,
    /// Assumed focal length for the convex/concave lens heuristics.
    pub focal_length: f32,
}

/// Cylindrical beaker shared by the buoyancy experiment.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BeakerSettings {
    pub centre: [f32; 3],
    pub radius: f32,
    /// Depth of the floor below the beaker centre.
    pub floor_depth: f32,
    /// Height of the liquid surface above the beaker centre.
    pub liquid_level: f32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SugarSettings {
    pub drop_position: [f32; 3],
    /// Relative amount of sugar per spoon; the grain count scales with this.
    pub amount: f32,
    pub grains_per_unit: usize,
    pub gravity: f32,
    /// Absolute height of the liquid surface in the sugar scene.
    pub liquid_level: f32,
    /// Number of independent beakers running the experiment side by side.
    pub beakers: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BodySettings {
    pub start_position: [f32; 3],
    pub radius: f32,
    pub density: f32,
    /// Dissolved sugar concentration in g/100ml. Raises the liquid density.
    pub concentration: f32,
    pub gravity: f32,
    pub water_drag: f32,
    pub air_drag: f32,
    pub restitution: f32,
    pub buoyancy_factor: f32,
    pub rise_threshold: f32,
    pub rise_speed: f32,
    pub spring_stiffness: f32,
    pub spring_damping: f32,
    /// Height the body is pinned at after a spring ascent. Defaults to the
    /// start height when absent.
    pub apex: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SieveSettings {
    pub batch_size: usize,
    pub grain_radii: Vec<f32>,
    /// Horizontal spawn extent; grains land uniformly in +/- extent / 2.
    pub spawn_extent: f32,
    pub spawn_height: f32,
    pub spawn_height_span: f32,
    /// Grains falling below this height leave the simulation.
    pub lost_threshold: f32,
    /// Maximum container tilt in radians.
    pub tilt_limit: f32,
    pub tilt_sensitivity: f32,
    pub gravity_magnitude: f32,
}

/// Headless demo driver parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunSettings {
    pub frames: u64,
    pub dt: f32,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Settings {
    pub fn drop_point(&self) -> Point3<f32> {
        Point3::from(self.sugar.drop_position)
    }
}

pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root();
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Error loading configuration: {}", err);
            std::process::exit(1);
        });

    let config: Settings = settings.try_deserialize().unwrap_or_else(|err| {
        eprintln!("Error deserializing configuration: {}", err);
        std::process::exit(1);
    });

    validate_config(&config);

    Ok(config)
}

pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root();

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        println!("Using local configuration: {:?}", local_config);
        local_config
    } else {
        println!("Using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(environment_source())
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Error loading configuration: {}", err);
            std::process::exit(1);
        });

    let mut config: Settings = settings.try_deserialize().unwrap_or_else(|err| {
        eprintln!("Error deserializing configuration: {}", err);
        std::process::exit(1);
    });

    // Parse command-line arguments and override values
    let args = CliArgs::parse();

    if let Some(concentration) = args.concentration {
        config.body.concentration = concentration;
    }
    if let Some(amount) = args.amount {
        config.sugar.amount = amount;
    }
    if let Some(beakers) = args.beakers {
        config.sugar.beakers = beakers;
    }
    if let Some(rec) = args.rec {
        config.ray.max_depth = rec;
    }
    if let Some(focal) = args.focal {
        config.ray.focal_length = focal;
    }
    if let Some(frames) = args.frames {
        config.run.frames = frames;
    }
    if let Some(dt) = args.dt {
        config.run.dt = dt;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    validate_config(&config);

    println!("{:#?}", config);

    Ok(config)
}

/// Environment overrides of the form `LABSIM__SECTION__KEY`.
fn environment_source() -> Environment {
    Environment::with_prefix("labsim")
        .prefix_separator("__")
        .separator("__")
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the LABSIM_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
/// If none of these methods work, the function will panic.
fn retrieve_project_root() -> std::path::PathBuf {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        std::path::PathBuf::from(manifest_dir)
    } else if let Ok(path) = env::var("LABSIM_ROOT_DIR") {
        // Allow explicit configuration via environment variable
        std::path::PathBuf::from(path)
    } else {
        // Fallback: try to find the nearest directory containing a "config" subdirectory
        // Start from the executable directory and walk upward
        let exe_path = env::current_exe().expect("Failed to get current executable path");
        let mut current_dir = exe_path
            .parent()
            .expect("Failed to get executable directory")
            .to_path_buf();
        let mut found = false;

        while !found && current_dir.parent().is_some() {
            if current_dir.join("config").is_dir() {
                found = true;
            } else {
                current_dir = current_dir.parent().unwrap().to_path_buf();
            }
        }

        if found {
            current_dir
        } else {
            panic!("Could not find project root directory");
        }
    }
}

fn validate_config(config: &Settings) {
    assert!(
        config.sugar.amount > 0.0,
        "Sugar amount must be greater than 0"
    );
    assert!(
        config.beaker.radius > 0.0,
        "Beaker radius must be greater than 0"
    );
    assert!(
        config.sieve.tilt_limit > 0.0,
        "Tilt limit must be greater than 0"
    );
    assert!(config.run.dt > 0.0, "Time step must be greater than 0");
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "labsim - simulation core for interactive science-lab experiments"
)]
pub struct CliArgs {
    /// Dissolved sugar concentration for the buoyancy experiment, in g/100ml.
    #[arg(short, long)]
    concentration: Option<f32>,

    /// Relative amount of sugar dropped per spoon. Scales the grain count.
    #[arg(short, long)]
    amount: Option<f32>,

    /// Number of independent sugar beakers to run side by side.
    #[arg(short, long)]
    beakers: Option<usize>,

    /// The maximum number of surface interactions before a ray is truncated.
    #[arg(long)]
    rec: Option<i32>,

    /// Assumed focal length for the lens heuristics.
    #[arg(long)]
    focal: Option<f32>,

    /// Number of frames to simulate in the headless run.
    #[arg(short, long)]
    frames: Option<u64>,

    /// Fixed time step per frame, in seconds.
    #[arg(long)]
    dt: Option<f32>,

    /// Random seed for the simulation.
    #[arg(short, long)]
    seed: Option<u64>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Ray Max Depth: {}
  - Ray Length: {:.3}
  - Focal Length: {:.3}
  - Sugar Amount: {:.3}
  - Sugar Beakers: {}
  - Concentration: {:.3}
  - Frames: {}
  - Time Step: {:.4}
  ",
            self.ray.max_depth,
            self.ray.length,
            self.ray.focal_length,
            self.sugar.amount,
            self.sugar.beakers,
            self.body.concentration,
            self.run.frames,
            self.run.dt,
        )
    }
}
