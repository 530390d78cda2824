use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{Point3, Vector3};

use labsim::experiment::Experiment;
use labsim::output;
use labsim::ray::{LensType, Surface, SurfaceKind};
use labsim::settings;

fn main() -> Result<()> {
    env_logger::init();

    let settings = settings::load_config()?;
    let frames = settings.run.frames;
    let dt = settings.run.dt;
    let output_dir = settings.run.output_dir.clone();

    let mut experiment = Experiment::new(settings);

    // Optical bench: a convex lens followed by a mirror, the default
    // arrangement of the optics module
    experiment.set_surfaces(vec![
        Surface {
            position: Point3::new(0.0, 0.0, 0.0),
            normal: Vector3::new(-1.0, 0.0, 0.0),
            kind: SurfaceKind::Lens {
                refr_index: 1.5,
                lens_type: Some(LensType::Convex),
            },
        },
        Surface {
            position: Point3::new(4.0, 0.0, 0.0),
            normal: Vector3::new(-1.0, 0.0, 0.0),
            kind: SurfaceKind::Mirror,
        },
    ]);

    experiment.pour_sugar();
    experiment.drop_body();
    experiment.spawn_grains();

    let bar = ProgressBar::new(frames);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} frames {msg}")
            .expect("invalid progress template"),
    );

    let mut last_frame = None;
    for _ in 0..frames {
        let frame = experiment.tick(dt);
        for event in &frame.events {
            bar.set_message(format!("{:?}", event));
        }
        last_frame = Some(frame);
        bar.inc(1);
    }
    bar.finish();

    if let Some(frame) = last_frame {
        let run_dir = output::writeup(&frame, Path::new(&output_dir))?;
        println!("Wrote final frame to {:?}", run_dir);
    }

    Ok(())
}
