//! Command implementations

mod build;
mod snap;
mod status;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;
use geolens_core::config::GeoLensConfig;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = GeoLensConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Build(args) => build::execute(args, &config, &output),
        Commands::Status(args) => status::execute(args, &config, &output),
        Commands::Snap(args) => snap::execute(args, &config, &output).await,
    }
}
