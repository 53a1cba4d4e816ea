//! Groundwork CLI - Command-line interface for terrain splat synthesis

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{apply, init, verify};

#[derive(Parser)]
#[command(name = "groundwork")]
#[command(about = "Paint terrain splat maps from grayscale masks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default splat config
    Init {
        /// Config file to create
        #[arg(default_value = "splat.toml")]
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Synthesize splat maps from the masks named in a config
    Apply {
        /// Path to the splat config
        config: String,

        /// Output directory for splat maps
        #[arg(short, long, default_value = "splat")]
        output: String,

        /// File name stem for the written maps
        #[arg(long, default_value = "splat")]
        stem: String,

        /// Override the alphamap width
        #[arg(long)]
        width: Option<i64>,

        /// Override the alphamap height
        #[arg(long)]
        height: Option<i64>,

        /// Override the layer count
        #[arg(long)]
        layers: Option<i64>,

        /// Accept grids thinner than two cells
        #[arg(long)]
        permissive: bool,

        /// Also dump the raw weight grid as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that written splat maps sum to one per cell
    Verify {
        /// Path to the splat config
        config: String,

        /// Splat map images, in layer order
        #[arg(required = true)]
        maps: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),
        Commands::Apply {
            config,
            output,
            stem,
            width,
            height,
            layers,
            permissive,
            json,
        } => apply::run(apply::ApplyArgs {
            config,
            output,
            stem,
            width,
            height,
            layers,
            permissive,
            json,
        }),
        Commands::Verify { config, maps } => verify::run(&config, &maps),
    }
}
