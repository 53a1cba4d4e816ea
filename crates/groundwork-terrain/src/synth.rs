//! Splat weight synthesis from grayscale masks
//!
//! Every output cell is computed on its own: the masks are sampled at the
//! cell's normalized coordinates, the raw weights are normalized to sum
//! to one, and cells without any mask signal fall back to a single layer.
//! Rows are split across the rayon pool; each worker writes only into the
//! row slice it owns.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use groundwork_core::{GridSize, GroundworkError, Result, WeightGrid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::layers::{LayerAssignment, MaskBinding};
use crate::sampler::{sample_clamped, GraySampler};

/// Cells whose summed mask weight is at or below this take the fallback layer
pub const DEFAULT_FALLBACK_EPSILON: f32 = 1e-4;

/// Rows computed between two cancellation checks
pub const DEFAULT_ROWS_PER_BATCH: usize = 64;

/// How grids narrower or shorter than two cells are handled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionPolicy {
    /// Width or height below 2 is an `InvalidDimension` error
    #[default]
    Strict,
    /// A single-cell axis samples at coordinate 0; a zero-cell axis yields an empty grid
    Permissive,
}

/// Tunables for one synthesis run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    #[serde(default = "default_fallback_epsilon")]
    pub fallback_epsilon: f32,
    #[serde(default)]
    pub fallback_layer: usize,
    #[serde(default)]
    pub dimension_policy: DimensionPolicy,
    #[serde(default = "default_rows_per_batch")]
    pub rows_per_batch: usize,
}

fn default_fallback_epsilon() -> f32 {
    DEFAULT_FALLBACK_EPSILON
}

fn default_rows_per_batch() -> usize {
    DEFAULT_ROWS_PER_BATCH
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            fallback_epsilon: DEFAULT_FALLBACK_EPSILON,
            fallback_layer: 0,
            dimension_policy: DimensionPolicy::Strict,
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
        }
    }
}

/// Cooperative cancellation flag, checked between row batches
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A sampler that failed during synthesis. Reported once per binding;
/// the affected cells read that binding as 0.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplerFaultReport {
    /// Index into the assignment's bindings
    pub binding: usize,
    pub name: String,
    pub layer: usize,
    /// Message of the first error seen for this binding
    pub message: String,
    /// Number of cells where sampling failed
    pub cells: usize,
}

impl SamplerFaultReport {
    /// The fault as a plain error value
    pub fn to_error(&self) -> GroundworkError {
        GroundworkError::SamplerFault {
            binding: self.binding,
            message: self.message.clone(),
        }
    }
}

/// Result of a synthesis run
#[derive(Clone, Debug)]
pub struct Synthesis {
    pub grid: WeightGrid,
    /// Faulted bindings, ordered by binding index
    pub faults: Vec<SamplerFaultReport>,
    /// Cells that took the fallback layer
    pub fallback_cells: usize,
}

/// Per-row bookkeeping merged after the parallel pass
#[derive(Default)]
struct RowStats {
    fallback_cells: usize,
    /// binding index -> (first message, failed cells)
    faults: BTreeMap<usize, (String, usize)>,
}

/// Turns a [`LayerAssignment`] into a normalized [`WeightGrid`]
#[derive(Clone, Debug, Default)]
pub struct SplatSynthesizer {
    options: SynthesisOptions,
}

impl SplatSynthesizer {
    pub fn new(options: SynthesisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Synthesize a `height` x `width` x `layers` grid.
    pub fn synthesize(
        &self,
        assignment: &LayerAssignment,
        width: usize,
        height: usize,
        layers: usize,
    ) -> Result<Synthesis> {
        self.synthesize_with_cancel(assignment, width, height, layers, &CancelToken::new())
    }

    /// Like [`synthesize`](Self::synthesize), aborting with `Cancelled`
    /// when `cancel` is set before a row batch starts. No partial grid is
    /// returned on cancellation.
    pub fn synthesize_with_cancel(
        &self,
        assignment: &LayerAssignment,
        width: usize,
        height: usize,
        layers: usize,
        cancel: &CancelToken,
    ) -> Result<Synthesis> {
        let size = GridSize::new(width, height, layers);
        let empty = || Synthesis {
            grid: WeightGrid::zeroed(size),
            faults: Vec::new(),
            fallback_cells: 0,
        };

        if layers == 0 {
            return Ok(empty());
        }

        match self.options.dimension_policy {
            DimensionPolicy::Strict if width < 2 || height < 2 => return Err(size.invalid()),
            DimensionPolicy::Permissive if width == 0 || height == 0 => return Ok(empty()),
            _ => {}
        }

        GridSize::checked(width, height, layers)?;

        let epsilon = self.options.fallback_epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(GroundworkError::Config(format!(
                "fallback epsilon must be a non-negative number, got {}",
                epsilon
            )));
        }
        let fallback = self.options.fallback_layer;
        if fallback >= layers {
            return Err(GroundworkError::InvalidLayerAssignment(format!(
                "fallback layer {} is outside the {} available layers",
                fallback, layers
            )));
        }

        // Bindings aimed past the last layer never contribute
        let active: Vec<(usize, &MaskBinding)> = assignment
            .bindings()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.layer < layers)
            .collect();

        let pass = RowPass {
            active: &active,
            width,
            height,
            layers,
            epsilon,
            fallback,
        };

        let mut grid = WeightGrid::zeroed(size);
        let row_len = width * layers;
        let batch_rows = self.options.rows_per_batch.clamp(1, height);
        let mut totals = RowStats::default();

        for (batch, rows) in grid
            .as_mut_slice()
            .chunks_mut(row_len * batch_rows)
            .enumerate()
        {
            if cancel.is_cancelled() {
                return Err(GroundworkError::Cancelled);
            }

            let first_row = batch * batch_rows;
            let stats: Vec<RowStats> = rows
                .par_chunks_mut(row_len)
                .enumerate()
                .map(|(i, out)| pass.fill_row(first_row + i, out))
                .collect();

            for row in stats {
                totals.fallback_cells += row.fallback_cells;
                for (binding, (message, cells)) in row.faults {
                    let entry = totals.faults.entry(binding).or_insert((message, 0));
                    entry.1 += cells;
                }
            }
        }

        let bindings = assignment.bindings();
        let faults = totals
            .faults
            .into_iter()
            .map(|(binding, (message, cells))| SamplerFaultReport {
                binding,
                name: bindings[binding].name.clone(),
                layer: bindings[binding].layer,
                message,
                cells,
            })
            .collect();

        Ok(Synthesis {
            grid,
            faults,
            fallback_cells: totals.fallback_cells,
        })
    }
}

/// Read-only state shared by every row worker
struct RowPass<'a> {
    active: &'a [(usize, &'a MaskBinding)],
    width: usize,
    height: usize,
    layers: usize,
    epsilon: f32,
    fallback: usize,
}

impl RowPass<'_> {
    fn fill_row(&self, row: usize, out: &mut [f32]) -> RowStats {
        let mut stats = RowStats::default();
        let v = normalized(row, self.height);

        for (col, cell) in out.chunks_mut(self.layers).enumerate() {
            let u = normalized(col, self.width);

            cell.fill(0.0);
            for (index, binding) in self.active {
                match sample_clamped(&*binding.sampler, u, v) {
                    Ok(w) => cell[binding.layer] += w,
                    Err(e) => {
                        let entry = stats.faults.entry(*index).or_insert_with(|| (e.to_string(), 0));
                        entry.1 += 1;
                    }
                }
            }

            let sum: f32 = cell.iter().sum();
            if sum <= self.epsilon {
                cell.fill(0.0);
                cell[self.fallback] = 1.0;
                stats.fallback_cells += 1;
            } else {
                for w in cell.iter_mut() {
                    *w /= sum;
                }
            }
        }

        stats
    }
}

/// Position of `index` along an axis of `extent` cells, in [0, 1]
fn normalized(index: usize, extent: usize) -> f32 {
    if extent > 1 {
        index as f32 / (extent - 1) as f32
    } else {
        0.0
    }
}

/// Synthesize with fixed slot semantics (slot `i` feeds layer `i`, at most
/// four slots read) and default options.
pub fn synthesize<I, S>(samplers: I, width: usize, height: usize, layers: usize) -> Result<WeightGrid>
where
    I: IntoIterator<Item = S>,
    S: GraySampler + 'static,
{
    let assignment = LayerAssignment::positional(samplers);
    SplatSynthesizer::default()
        .synthesize(&assignment, width, height, layers)
        .map(|s| s.grid)
}
