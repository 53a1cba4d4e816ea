//! Splat map export and read-back
//!
//! Layers are packed four to an RGBA8 image: layer `4k + c` lands in
//! channel `c` of image `k`. Files are staged next to their destination
//! and renamed only after every image encoded, so a failed export never
//! leaves a half-written map set behind.

use std::path::{Path, PathBuf};

use groundwork_core::{GridSize, GroundworkError, Result, WeightGrid};
use image::{ImageFormat, Rgba, RgbaImage};

/// Layers stored per RGBA image
pub const LAYERS_PER_MAP: usize = 4;

/// Largest per-channel error introduced by 8-bit quantization
pub const QUANTIZATION_STEP: f32 = 0.5 / 255.0;

/// Number of RGBA images needed for `layers` layers
pub fn map_count(layers: usize) -> usize {
    layers.div_ceil(LAYERS_PER_MAP)
}

/// Pack a weight grid into RGBA8 splat images
pub fn splat_images(grid: &WeightGrid) -> Vec<RgbaImage> {
    let (width, height, layers) = (grid.width(), grid.height(), grid.layers());
    let mut images: Vec<RgbaImage> = (0..map_count(layers))
        .map(|_| RgbaImage::new(width as u32, height as u32))
        .collect();

    for row in 0..height {
        for col in 0..width {
            let cell = grid.cell(row, col);
            for (k, image) in images.iter_mut().enumerate() {
                let mut pixel = [0u8; 4];
                for (c, channel) in pixel.iter_mut().enumerate() {
                    if let Some(w) = cell.get(k * LAYERS_PER_MAP + c) {
                        *channel = (w.clamp(0.0, 1.0) * 255.0).round() as u8;
                    }
                }
                image.put_pixel(col as u32, row as u32, Rgba(pixel));
            }
        }
    }

    images
}

/// Destination path of splat image `index`
pub fn splat_map_path(dir: &Path, stem: &str, index: usize) -> PathBuf {
    dir.join(format!("{}_{}.png", stem, index))
}

/// Write `<stem>_<k>.png` files into `dir` and return their paths.
pub fn write_splat_maps(grid: &WeightGrid, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    write_splat_set(grid, dir, stem, false)
}

/// Write the splat maps and, with `json`, a `<stem>.json` grid dump next
/// to them. Nothing is renamed into place until every file is staged;
/// the JSON is committed first so a failure there leaves no new maps.
pub fn write_splat_set(
    grid: &WeightGrid,
    dir: &Path,
    stem: &str,
    json: bool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut staged = Vec::new();
    if json {
        staged.push(stage_json(grid, &dir.join(format!("{}.json", stem)))?);
    }
    if let Err(e) = stage_splat_maps(grid, dir, stem, &mut staged) {
        discard(&staged);
        return Err(e);
    }

    commit(staged)
}

/// Dump the raw grid as JSON
pub fn write_grid_json(grid: &WeightGrid, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let staged = stage_json(grid, path)?;
    commit(vec![staged])?;
    Ok(())
}

fn stage_splat_maps(
    grid: &WeightGrid,
    dir: &Path,
    stem: &str,
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<()> {
    for (index, image) in splat_images(grid).iter().enumerate() {
        let path = splat_map_path(dir, stem, index);
        let tmp = staging_path(&path);
        if let Err(e) = image.save_with_format(&tmp, ImageFormat::Png) {
            std::fs::remove_file(&tmp).ok();
            return Err(GroundworkError::Export(format!(
                "failed to write '{}': {}",
                path.display(),
                e
            )));
        }
        staged.push((tmp, path));
    }
    Ok(())
}

fn stage_json(grid: &WeightGrid, path: &Path) -> Result<(PathBuf, PathBuf)> {
    let json = serde_json::to_string(grid)
        .map_err(|e| GroundworkError::Export(format!("failed to encode grid: {}", e)))?;
    let tmp = staging_path(path);
    std::fs::write(&tmp, json)?;
    Ok((tmp, path.to_path_buf()))
}

/// Read splat images back into a grid with `layers` layers.
///
/// All images must share one size and together provide at least
/// `layers` channels.
pub fn read_splat_maps(paths: &[PathBuf], layers: usize) -> Result<WeightGrid> {
    if map_count(layers) > paths.len() {
        return Err(GroundworkError::Export(format!(
            "{} layers need {} splat maps, got {}",
            layers,
            map_count(layers),
            paths.len()
        )));
    }

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let img = image::open(path).map_err(|e| {
            GroundworkError::Export(format!("failed to read '{}': {}", path.display(), e))
        })?;
        images.push(img.into_rgba8());
    }

    let (width, height) = images
        .first()
        .map(|img| img.dimensions())
        .unwrap_or((0, 0));
    if let Some((i, img)) = images
        .iter()
        .enumerate()
        .find(|(_, img)| img.dimensions() != (width, height))
    {
        return Err(GroundworkError::Export(format!(
            "'{}' is {}x{}, expected {}x{}",
            paths[i].display(),
            img.width(),
            img.height(),
            width,
            height
        )));
    }

    let size = GridSize::new(width as usize, height as usize, layers);
    let mut weights = Vec::with_capacity(size.len());
    for y in 0..height {
        for x in 0..width {
            for layer in 0..layers {
                let pixel = images[layer / LAYERS_PER_MAP].get_pixel(x, y);
                weights.push(pixel.0[layer % LAYERS_PER_MAP] as f32 / 255.0);
            }
        }
    }

    WeightGrid::from_raw(size, weights)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn commit(staged: Vec<(PathBuf, PathBuf)>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(staged.len());
    for (i, (tmp, path)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(tmp, path) {
            discard(&staged[i..]);
            return Err(e.into());
        }
        written.push(path.clone());
    }
    Ok(written)
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        std::fs::remove_file(tmp).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("groundwork_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn six_layer_grid() -> WeightGrid {
        // 2x2 cells; each cell puts its weight on a different layer
        let mut weights = vec![0.0; 2 * 2 * 6];
        for (cell, layer) in [0usize, 2, 4, 5].iter().enumerate() {
            weights[cell * 6 + layer] = 1.0;
        }
        WeightGrid::from_raw(GridSize::new(2, 2, 6), weights).unwrap()
    }

    #[test]
    fn packs_four_layers_per_image() {
        assert_eq!(map_count(0), 0);
        assert_eq!(map_count(4), 1);
        assert_eq!(map_count(5), 2);

        let images = splat_images(&six_layer_grid());
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].get_pixel(0, 0).0, [255, 0, 0, 0]);
        assert_eq!(images[0].get_pixel(1, 0).0, [0, 0, 255, 0]);
        assert_eq!(images[1].get_pixel(0, 1).0, [255, 0, 0, 0]);
        assert_eq!(images[1].get_pixel(1, 1).0, [0, 255, 0, 0]);
    }

    #[test]
    fn rounding_to_bytes() {
        let grid = WeightGrid::from_raw(GridSize::new(1, 1, 2), vec![0.2, 0.8]).unwrap();
        let images = splat_images(&grid);
        assert_eq!(images[0].get_pixel(0, 0).0, [51, 204, 0, 0]);
    }

    #[test]
    fn written_maps_read_back() {
        let dir = temp_dir();
        let grid = six_layer_grid();

        let paths = write_splat_maps(&grid, &dir, "splat").unwrap();
        assert_eq!(paths, vec![dir.join("splat_0.png"), dir.join("splat_1.png")]);
        assert!(!dir.join("splat_0.png.tmp").exists());

        let back = read_splat_maps(&paths, 6).unwrap();
        assert_eq!(back, grid);

        assert!(read_splat_maps(&paths[..1], 6).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mismatched_map_sizes_rejected() {
        let dir = temp_dir();
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        RgbaImage::new(2, 2).save(&a).unwrap();
        RgbaImage::new(3, 2).save(&b).unwrap();

        let err = read_splat_maps(&[a, b], 8).unwrap_err();
        assert!(matches!(err, GroundworkError::Export(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_failure_leaves_no_new_maps() {
        let dir = temp_dir();
        // A directory where the JSON dump should go makes its rename fail
        std::fs::create_dir_all(dir.join("splat.json")).unwrap();

        let err = write_splat_set(&six_layer_grid(), &dir, "splat", true);
        assert!(err.is_err());
        assert!(!dir.join("splat_0.png").exists());
        assert!(!dir.join("splat_1.png").exists());
        assert!(!dir.join("splat_0.png.tmp").exists());
        assert!(!dir.join("splat.json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn splat_set_with_json() {
        let dir = temp_dir();
        let grid = six_layer_grid();

        let paths = write_splat_set(&grid, &dir, "terrain", true).unwrap();
        assert_eq!(paths[0], dir.join("terrain.json"));
        assert_eq!(paths.len(), 3);

        let text = std::fs::read_to_string(&paths[0]).unwrap();
        let parsed: WeightGrid = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, grid);
        assert_eq!(read_splat_maps(&paths[1..], 6).unwrap(), grid);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn grid_json_dump() {
        let dir = temp_dir();
        let path = dir.join("nested").join("grid.json");
        let grid = WeightGrid::from_raw(GridSize::new(1, 1, 2), vec![0.25, 0.75]).unwrap();

        write_grid_json(&grid, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: WeightGrid = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, grid);
        std::fs::remove_dir_all(&dir).ok();
    }
}
