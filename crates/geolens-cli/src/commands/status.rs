//! Status command: report configuration and index artifact health

use crate::cli::StatusArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use geolens_core::config::GeoLensConfig;
use geolens_index::persist;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusOutput {
    region: String,
    data_dir: String,
    index_built: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_partitioned: Option<bool>,
}

pub fn execute(args: StatusArgs, config: &GeoLensConfig, output: &OutputWriter) -> Result<()> {
    let index_path = config.index_path();
    let metadata_path = config.metadata_path();

    let index = if index_path.exists() || metadata_path.exists() {
        match persist::load(&index_path, &metadata_path) {
            Ok(index) => Some(index),
            Err(e) => {
                output.warning(format!("Index artifacts are unreadable: {}", e));
                None
            }
        }
    } else {
        None
    };

    if output.is_json() {
        let status = StatusOutput {
            region: config.region.name.clone(),
            data_dir: config.data_dir.display().to_string(),
            index_built: index.is_some(),
            index_entries: index.as_ref().map(|i| i.len()),
            index_dimension: index.as_ref().map(|i| i.dimension()),
            index_partitioned: index.as_ref().map(|i| i.is_partitioned()),
        };
        output.result(status)?;
        return Ok(());
    }

    output.section("Configuration");
    output.kv("Region", &config.region.name);
    output.kv("Planar CRS", format!("EPSG:{}", config.region.planar_epsg));
    output.kv("Data Directory", config.data_dir.display());
    if args.verbose {
        output.kv("Retrieval Top-K", config.retrieval_top_k);
        output.kv("Cluster Radius", format!("{} km", config.cluster_radius_km));
        output.kv("Snap Distance", format!("{} m", config.snap_max_distance_m));
        output.kv("Result TTL", format!("{} h", config.result_ttl_hours));
    }

    output.section("Index Status");
    match index {
        Some(index) => {
            output.kv("Status", "Built");
            output.kv("Entries", index.len());
            output.kv("Dimension", index.dimension());
            output.kv("Layout", if index.is_partitioned() { "partitioned" } else { "flat" });
        }
        None => {
            output.kv("Status", "Not built");
            output.info("Run 'geolens build <manifest>' to create the index");
        }
    }

    Ok(())
}
