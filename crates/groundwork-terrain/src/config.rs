//! Splat configuration files
//!
//! A config names the alphamap resolution, the synthesis tunables and the
//! ordered layer list. Values are resolved with this precedence (highest wins):
//! 1. Environment variables: `GROUNDWORK_FALLBACK_EPSILON`
//! 2. The config file
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use groundwork_core::{GridSize, GroundworkError, Result};
use serde::{Deserialize, Serialize};

use crate::layers::{LayerSet, TerrainLayer};
use crate::synth::{
    DimensionPolicy, SynthesisOptions, DEFAULT_FALLBACK_EPSILON, DEFAULT_ROWS_PER_BATCH,
};

/// Environment variable overriding `synthesis.fallback_epsilon`
pub const FALLBACK_EPSILON_ENV: &str = "GROUNDWORK_FALLBACK_EPSILON";

/// Output grid resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphamapSection {
    pub width: i64,
    pub height: i64,
    /// Defaults to the number of configured layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<i64>,
}

impl Default for AlphamapSection {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            layers: None,
        }
    }
}

/// Synthesis tunables as written in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSection {
    #[serde(default = "default_fallback_epsilon")]
    pub fallback_epsilon: f32,
    #[serde(default)]
    pub fallback_layer: usize,
    #[serde(default = "default_true")]
    pub strict: bool,
    #[serde(default = "default_rows_per_batch")]
    pub rows_per_batch: usize,
}

fn default_fallback_epsilon() -> f32 {
    DEFAULT_FALLBACK_EPSILON
}

fn default_true() -> bool {
    true
}

fn default_rows_per_batch() -> usize {
    DEFAULT_ROWS_PER_BATCH
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            fallback_epsilon: DEFAULT_FALLBACK_EPSILON,
            fallback_layer: 0,
            strict: true,
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
        }
    }
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplatConfig {
    /// Directory relative mask paths are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_dir: Option<PathBuf>,
    #[serde(default)]
    pub alphamap: AlphamapSection,
    #[serde(default)]
    pub synthesis: SynthesisSection,
    #[serde(default)]
    pub layers: Vec<TerrainLayer>,
    /// Directory of the file this config was loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SplatConfig {
    /// Load a config file and apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse a config without touching the environment
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The stock four-layer setup at 512x512, masks read from `masks/`
    pub fn default_template() -> Self {
        Self {
            mask_dir: Some(PathBuf::from("masks")),
            alphamap: AlphamapSection::default(),
            synthesis: SynthesisSection::default(),
            layers: LayerSet::default_set().layers,
            base_dir: PathBuf::new(),
        }
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(FALLBACK_EPSILON_ENV) {
            let epsilon: f32 = raw.trim().parse().map_err(|_| {
                GroundworkError::Config(format!("{} is not a number: '{}'", FALLBACK_EPSILON_ENV, raw))
            })?;
            log::debug!("fallback epsilon overridden by {}: {}", FALLBACK_EPSILON_ENV, epsilon);
            self.synthesis.fallback_epsilon = epsilon;
        }
        Ok(())
    }

    pub fn layer_set(&self) -> LayerSet {
        LayerSet::new(self.layers.clone())
    }

    /// Directory masks are resolved against
    pub fn mask_base(&self) -> PathBuf {
        match &self.mask_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.clone(),
        }
    }

    /// Validated output size; layer count defaults to the configured layers
    pub fn grid_size(&self) -> Result<GridSize> {
        let layers = self
            .alphamap
            .layers
            .unwrap_or(self.layers.len() as i64);
        GridSize::from_signed(self.alphamap.width, self.alphamap.height, layers)
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            fallback_epsilon: self.synthesis.fallback_epsilon,
            fallback_layer: self.synthesis.fallback_layer,
            dimension_policy: if self.synthesis.strict {
                DimensionPolicy::Strict
            } else {
                DimensionPolicy::Permissive
            },
            rows_per_batch: self.synthesis.rows_per_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerAssignment;
    use crate::sampler::Constant;
    use crate::synth::SplatSynthesizer;

    #[test]
    fn parse_full_config() {
        let toml = r#"
mask_dir = "textures"

[alphamap]
width = 257
height = 129
layers = 6

[synthesis]
fallback_epsilon = 0.001
fallback_layer = 1
strict = false

[[layers]]
name = "grass"
mask = "grass.png"
texture = "grass_albedo.png"

[[layers]]
name = "rock"
"#;
        let config = SplatConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.grid_size().unwrap(), GridSize::new(257, 129, 6));
        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.layers[1].mask, None);

        let options = config.synthesis_options();
        assert_eq!(options.fallback_epsilon, 0.001);
        assert_eq!(options.fallback_layer, 1);
        assert_eq!(options.dimension_policy, DimensionPolicy::Permissive);
        assert_eq!(options.rows_per_batch, DEFAULT_ROWS_PER_BATCH);
    }

    #[test]
    fn layer_count_defaults_to_layer_list() {
        let toml = r#"
[alphamap]
width = 16
height = 16

[[layers]]
name = "a"

[[layers]]
name = "b"

[[layers]]
name = "c"
"#;
        let config = SplatConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.grid_size().unwrap().layers, 3);
        assert_eq!(config.synthesis_options(), SynthesisOptions::default());
    }

    #[test]
    fn negative_values_rejected() {
        let mut config = SplatConfig::default_template();
        config.alphamap.layers = Some(-1);
        assert!(matches!(
            config.grid_size(),
            Err(GroundworkError::InvalidDimension { layers: -1, .. })
        ));

        config.alphamap.layers = None;
        config.alphamap.width = -4;
        assert!(matches!(
            config.grid_size(),
            Err(GroundworkError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn oversized_values_do_not_panic() {
        let toml = r#"
[alphamap]
width = 4
height = 4
layers = 2

[synthesis]
rows_per_batch = 9223372036854775807
"#;
        let config = SplatConfig::from_toml_str(toml).unwrap();
        let size = config.grid_size().unwrap();
        let assignment = LayerAssignment::new().with("flat", Constant(0.3), 0);
        let out = SplatSynthesizer::new(config.synthesis_options())
            .synthesize(&assignment, size.width, size.height, size.layers)
            .unwrap();
        assert!(out.grid.is_normalized(1e-6));

        let toml = r#"
[alphamap]
width = 9223372036854775807
height = 9223372036854775807
layers = 4
"#;
        let config = SplatConfig::from_toml_str(toml).unwrap();
        assert!(matches!(
            config.grid_size(),
            Err(GroundworkError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn template_roundtrips_through_toml() {
        let template = SplatConfig::default_template();
        let text = template.to_toml_string().unwrap();
        assert!(text.contains("grass-heightmap.png"));
        let parsed = SplatConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, template);
    }

    #[test]
    fn overrides_replace_epsilon() {
        let mut config = SplatConfig::default_template();
        config
            .apply_overrides(|key| (key == FALLBACK_EPSILON_ENV).then(|| " 0.02 ".to_string()))
            .unwrap();
        assert_eq!(config.synthesis.fallback_epsilon, 0.02);

        let err = config
            .apply_overrides(|_| Some("lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, GroundworkError::Config(_)));
    }

    #[test]
    fn mask_base_resolution() {
        let mut config = SplatConfig::default_template();
        config.base_dir = PathBuf::from("/project/terrain");
        assert_eq!(config.mask_base(), PathBuf::from("/project/terrain/masks"));
        config.mask_dir = None;
        assert_eq!(config.mask_base(), PathBuf::from("/project/terrain"));
    }
}
