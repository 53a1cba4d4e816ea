//! Splat synthesis command

use std::path::Path;

use anyhow::{Context, Result};
use groundwork_core::GridDigest;
use groundwork_terrain::{
    write_splat_set, LayerAssignment, MaskLoadReport, SplatConfig, SplatSynthesizer, Synthesis,
};

pub struct ApplyArgs {
    pub config: String,
    pub output: String,
    pub stem: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub layers: Option<i64>,
    pub permissive: bool,
    pub json: bool,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let mut config = SplatConfig::load(Path::new(&args.config))
        .with_context(|| format!("failed to load config '{}'", args.config))?;

    if let Some(width) = args.width {
        config.alphamap.width = width;
    }
    if let Some(height) = args.height {
        config.alphamap.height = height;
    }
    if args.layers.is_some() {
        config.alphamap.layers = args.layers;
    }
    if args.permissive {
        config.synthesis.strict = false;
    }

    let size = config.grid_size()?;
    if config.layers.len() > size.layers {
        log::warn!(
            "{} layers configured but only {} requested; masks for the rest are ignored",
            config.layers.len(),
            size.layers
        );
    }

    let mask_base = config.mask_base();
    let (assignment, report) = LayerAssignment::from_layer_set(&config.layer_set(), &mask_base);
    log_mask_report(&report, &mask_base, config.synthesis.fallback_layer);

    let synthesizer = SplatSynthesizer::new(config.synthesis_options());
    // The grid is only written once synthesis fully succeeded
    let synthesis = synthesizer.synthesize(&assignment, size.width, size.height, size.layers)?;
    for fault in &synthesis.faults {
        log::warn!(
            "Mask '{}' (layer {}) failed on {} cell(s), treated as no signal: {}",
            fault.name,
            fault.layer,
            fault.cells,
            fault.message
        );
    }

    let output = Path::new(&args.output);
    let written = write_splat_set(&synthesis.grid, output, &args.stem, args.json)?;

    print_summary(&config, &synthesis);
    for path in &written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn log_mask_report(report: &MaskLoadReport, mask_base: &Path, fallback_layer: usize) {
    if report.no_masks() {
        log::warn!(
            "No mask textures found under {}. Painting will default to layer {}.",
            mask_base.display(),
            fallback_layer
        );
    }
    for (name, path) in &report.missing {
        log::info!("No mask for layer '{}' ({})", name, path.display());
    }
    if !report.unreadable.is_empty() {
        let names: Vec<&str> = report.unreadable.iter().map(|(n, _, _)| n.as_str()).collect();
        log::warn!(
            "One or more masks could not be read ({}); they contribute no weight",
            names.join(", ")
        );
        for (_, path, message) in &report.unreadable {
            log::debug!("{}: {}", path.display(), message);
        }
    }
}

fn print_summary(config: &SplatConfig, synthesis: &Synthesis) {
    let grid = &synthesis.grid;
    println!(
        "Applied splat maps ({}x{}, {} layer(s))",
        grid.width(),
        grid.height(),
        grid.layers()
    );

    for (index, coverage) in grid.layer_coverage().iter().enumerate() {
        let name = config
            .layers
            .get(index)
            .map(|l| l.name.as_str())
            .unwrap_or("-");
        println!("  [{}] {:<12} {:>6.2}%", index, name, coverage * 100.0);
    }

    println!("  Fallback cells: {}", synthesis.fallback_cells);
    println!("  Digest: {}", GridDigest::of_grid(grid).to_prefixed_hex());
}
