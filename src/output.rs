use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use itertools::Itertools;

use crate::experiment::FrameSnapshot;
use crate::ray::LightPath;


/// One line per segment: start and end coordinates, space separated.
pub fn path_lines(path: &LightPath) -> String {
    path.segments
        .iter()
        .map(|s| {
            format!(
                "{} {} {} {} {} {}",
                s.start.x, s.start.y, s.start.z, s.end.x, s.end.y, s.end.z
            )
        })
        .join("\n")
}

/// Writes the final frame snapshot under a timestamped run directory and
/// returns its path.
pub fn writeup(snapshot: &FrameSnapshot, base_dir: &Path) -> Result<PathBuf> {
    let run_dir = base_dir.join(format!("run_{}", Local::now().format("%Y%m%d_%H%M%S")));
    fs::create_dir_all(&run_dir)?;

    let file = File::create(run_dir.join("frame.json"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;

    let file = File::create(run_dir.join("light_path.txt"))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", path_lines(&snapshot.light_path))?;

    Ok(run_dir)
}
