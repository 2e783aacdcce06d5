use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GeoLens - hybrid photo geolocation for a bounded region
#[derive(Parser, Debug)]
#[command(name = "geolens")]
#[command(about = "Hybrid photo geolocation tooling", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a GeoLens TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the retrieval index from a reference manifest
    Build(BuildArgs),

    /// Show index and configuration status
    Status(StatusArgs),

    /// Snap a coordinate to the nearest building footprint
    Snap(SnapArgs),
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Reference manifest: one JSON object per line with lat, lon,
    /// source_id, image_ref, and embedding fields
    pub manifest: PathBuf,

    /// Overwrite existing index artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Include per-artifact detail
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct SnapArgs {
    /// Latitude of the point to snap
    pub lat: f64,

    /// Longitude of the point to snap
    pub lon: f64,

    /// Maximum snap distance in meters (defaults to the configured value)
    #[arg(long)]
    pub max_distance: Option<f64>,
}
