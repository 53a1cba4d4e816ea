//! Terrain layer descriptors and mask-to-layer assignment

use std::fmt;
use std::path::{Path, PathBuf};

use groundwork_core::Result;
use serde::{Deserialize, Serialize};

use crate::mask::GrayImage;
use crate::sampler::GraySampler;

/// Number of sampler slots read by [`LayerAssignment::positional`]
pub const MAX_POSITIONAL_SLOTS: usize = 4;

/// One terrain material channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayer {
    /// Display name (e.g. "grass")
    pub name: String,
    /// Grayscale mask that paints this layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<PathBuf>,
    /// Albedo texture for the renderer; carried through, never read here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<PathBuf>,
}

impl TerrainLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mask: None,
            texture: None,
        }
    }

    pub fn with_mask(mut self, mask: impl Into<PathBuf>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn with_texture(mut self, texture: impl Into<PathBuf>) -> Self {
        self.texture = Some(texture.into());
        self
    }
}

/// An ordered list of layers; position in the list is the layer index
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSet {
    pub layers: Vec<TerrainLayer>,
}

impl LayerSet {
    pub fn new(layers: Vec<TerrainLayer>) -> Self {
        Self { layers }
    }

    /// The stock grass / dirt / sand / soil setup
    pub fn default_set() -> Self {
        Self::new(vec![
            TerrainLayer::new("grass").with_mask("grass-heightmap.png"),
            TerrainLayer::new("dirt").with_mask("dirt.png"),
            TerrainLayer::new("sand").with_mask("sand.png"),
            TerrainLayer::new("soil").with_mask("soil.png"),
        ])
    }

    /// Build a set from every image file in `dir`, ordered by file name.
    /// Each file becomes a layer named after its stem, masked by itself.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && image::ImageFormat::from_path(p).is_ok())
            .collect();
        paths.sort();

        let layers = paths
            .into_iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                TerrainLayer::new(name).with_mask(path)
            })
            .collect();

        Ok(Self::new(layers))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }
}

/// A sampler bound to the layer it contributes to
pub struct MaskBinding {
    /// Label used in fault reports
    pub name: String,
    pub sampler: Box<dyn GraySampler>,
    /// Target layer index
    pub layer: usize,
}

impl MaskBinding {
    pub fn new(name: impl Into<String>, sampler: impl GraySampler + 'static, layer: usize) -> Self {
        Self {
            name: name.into(),
            sampler: Box::new(sampler),
            layer,
        }
    }
}

impl fmt::Debug for MaskBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskBinding")
            .field("name", &self.name)
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

/// Ordered (sampler, target layer) pairs feeding one synthesis run
#[derive(Debug, Default)]
pub struct LayerAssignment {
    bindings: Vec<MaskBinding>,
}

impl LayerAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed slot semantics: slot `i` feeds layer `i`, and only the first
    /// [`MAX_POSITIONAL_SLOTS`] samplers are kept.
    pub fn positional<I, S>(samplers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: GraySampler + 'static,
    {
        let bindings = samplers
            .into_iter()
            .take(MAX_POSITIONAL_SLOTS)
            .enumerate()
            .map(|(slot, sampler)| MaskBinding::new(format!("slot{}", slot), sampler, slot))
            .collect();
        Self { bindings }
    }

    /// Load the mask of every layer in `set`.
    ///
    /// Relative mask paths are resolved against `base_dir`. Missing or
    /// undecodable masks leave their layer without a binding and are
    /// listed in the returned report.
    pub fn from_layer_set(set: &LayerSet, base_dir: &Path) -> (Self, MaskLoadReport) {
        let mut assignment = Self::new();
        let mut report = MaskLoadReport::default();

        for (index, layer) in set.layers.iter().enumerate() {
            let Some(mask) = &layer.mask else {
                continue;
            };
            let path = if mask.is_absolute() {
                mask.clone()
            } else {
                base_dir.join(mask)
            };

            if !path.exists() {
                report.missing.push((layer.name.clone(), path));
                continue;
            }

            match GrayImage::from_path(&path) {
                Ok(image) => {
                    assignment.bind(MaskBinding::new(layer.name.clone(), image, index));
                    report.loaded += 1;
                }
                Err(e) => report.unreadable.push((layer.name.clone(), path, e.to_string())),
            }
        }

        (assignment, report)
    }

    pub fn bind(&mut self, binding: MaskBinding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    pub fn with(mut self, name: impl Into<String>, sampler: impl GraySampler + 'static, layer: usize) -> Self {
        self.bind(MaskBinding::new(name, sampler, layer));
        self
    }

    pub fn bindings(&self) -> &[MaskBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Outcome of resolving a layer set's masks
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaskLoadReport {
    pub loaded: usize,
    /// (layer name, resolved path)
    pub missing: Vec<(String, PathBuf)>,
    /// (layer name, resolved path, decoder message)
    pub unreadable: Vec<(String, PathBuf, String)>,
}

impl MaskLoadReport {
    /// No mask carries any signal; every cell will take the fallback layer
    pub fn no_masks(&self) -> bool {
        self.loaded == 0
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unreadable.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{Absent, Constant};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("groundwork_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn positional_keeps_four_slots() {
        let assignment = LayerAssignment::positional(vec![Constant(0.1); 6]);
        assert_eq!(assignment.len(), MAX_POSITIONAL_SLOTS);
        let layers: Vec<usize> = assignment.bindings().iter().map(|b| b.layer).collect();
        assert_eq!(layers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn explicit_bindings_keep_order() {
        let assignment = LayerAssignment::new()
            .with("rock", Constant(0.5), 6)
            .with("snow", Absent, 2);
        assert_eq!(assignment.bindings()[0].layer, 6);
        assert_eq!(assignment.bindings()[1].name, "snow");
    }

    #[test]
    fn default_set_names() {
        let set = LayerSet::default_set();
        assert_eq!(set.names(), vec!["grass", "dirt", "sand", "soil"]);
        assert_eq!(set.layers[0].mask.as_deref(), Some(Path::new("grass-heightmap.png")));
    }

    #[test]
    fn missing_and_unreadable_masks_are_reported() {
        let dir = temp_dir();
        image::GrayImage::from_pixel(2, 2, image::Luma([128u8]))
            .save(dir.join("dirt.png"))
            .unwrap();
        std::fs::write(dir.join("sand.png"), b"not a png").unwrap();

        let (assignment, report) = LayerAssignment::from_layer_set(&LayerSet::default_set(), &dir);

        assert_eq!(report.loaded, 1);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.bindings()[0].layer, 1);
        let missing: Vec<&str> = report.missing.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(missing, vec!["grass", "soil"]);
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].0, "sand");
        assert!(!report.no_masks());
        assert!(!report.is_clean());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn discover_sorts_by_file_name() {
        let dir = temp_dir();
        for name in ["b_rock.png", "a_moss.png"] {
            image::GrayImage::from_pixel(2, 2, image::Luma([0u8]))
                .save(dir.join(name))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let set = LayerSet::discover(&dir).unwrap();
        assert_eq!(set.names(), vec!["a_moss", "b_rock"]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
