use std::path::PathBuf;

use conebeam::utils::parse_triplet;

/// Command line interface for `conebeam` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "conebeam", about = "Simulate cone-beam CT projections of analytic phantoms")]
pub (super) struct Cli {
    /// TOML scan description
    #[clap(short, long, default_value = "conebeam.toml")]
    pub config: PathBuf,

    /// Output file: raw little-endian f32, x fastest
    #[clap(short, long)]
    pub out: PathBuf,

    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub threads: usize,

    /// Override the number of voxels of the configured volume, e.g. `64,64,64`
    #[clap(short, long, value_parser = parse_triplet::<usize>)]
    pub n_voxels: Option<(usize, usize, usize)>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub (super) enum Command {
    /// Rasterize the configured phantom onto the configured volume
    Phantom,

    /// Forward project the configured phantom into a stack of projections,
    /// analytically or through its rasterized volume
    Project,
}
