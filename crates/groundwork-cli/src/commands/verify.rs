//! Splat map verification command

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use groundwork_terrain::export::QUANTIZATION_STEP;
use groundwork_terrain::{read_splat_maps, SplatConfig};

pub fn run(config: &str, maps: &[String]) -> Result<()> {
    let config = SplatConfig::load(Path::new(config))?;
    let layers = config.grid_size()?.layers;
    let paths: Vec<PathBuf> = maps.iter().map(PathBuf::from).collect();

    let grid = read_splat_maps(&paths, layers)?;
    let tolerance = layers as f32 * QUANTIZATION_STEP;
    let error = grid.max_normalization_error();

    println!(
        "Checked {}x{} cells across {} layer(s)",
        grid.width(),
        grid.height(),
        layers
    );
    println!("  Max deviation: {:.5} (tolerance {:.5})", error, tolerance);

    if error > tolerance {
        bail!("splat maps are not normalized");
    }
    println!("  OK");
    Ok(())
}
