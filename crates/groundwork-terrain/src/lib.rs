//! Groundwork Terrain - Mask-driven splat weight synthesis
//!
//! Samples grayscale masks over a regular grid, normalizes the per-cell
//! layer weights and falls back to a default layer where no mask has
//! signal. Does not depend on any renderer: outputs a `WeightGrid` and
//! optional RGBA splat images for a terrain consumer to persist.

pub mod config;
pub mod export;
pub mod layers;
pub mod mask;
pub mod sampler;
pub mod synth;

pub use config::SplatConfig;
pub use export::{
    read_splat_maps, splat_images, write_grid_json, write_splat_maps, write_splat_set,
};
pub use layers::{LayerAssignment, LayerSet, MaskBinding, MaskLoadReport, TerrainLayer};
pub use mask::GrayImage;
pub use sampler::{Absent, Constant, FnSampler, GraySampler};
pub use synth::{
    synthesize, CancelToken, DimensionPolicy, SamplerFaultReport, SplatSynthesizer, Synthesis,
    SynthesisOptions, DEFAULT_FALLBACK_EPSILON,
};
