//! Snap command: one-off building-footprint lookup for a coordinate

use crate::cli::SnapArgs;
use crate::output::OutputWriter;
use anyhow::{bail, Result};
use geolens_core::config::GeoLensConfig;
use geolens_core::models::GeoPoint;
use geolens_geo::{BuildingSnapper, OverpassClient};
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(args: SnapArgs, config: &GeoLensConfig, output: &OutputWriter) -> Result<()> {
    let point = GeoPoint::new(args.lat, args.lon);
    if !point.is_valid() {
        bail!("Coordinates out of range: {}, {}", args.lat, args.lon);
    }
    if !config.region.bbox.contains(&point) {
        output.warning(format!(
            "Point lies outside the {} region bounding box",
            config.region.name
        ));
    }

    let max_distance = args.max_distance.unwrap_or(config.snap_max_distance_m);

    let overpass = OverpassClient::new(
        &config.overpass_url,
        Duration::from_secs(config.connect_timeout_secs),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let snapper = BuildingSnapper::new(
        config.footprint_cache_dir(),
        Arc::new(overpass),
        config.region.planar_epsg,
    );

    match snapper.snap(point, max_distance).await {
        Some(matched) => {
            if output.is_json() {
                output.result(&matched)?;
            } else {
                output.success(format!(
                    "Snapped to {} '{}' at {:.6}, {:.6} ({:.1} m away)",
                    matched.building_kind,
                    if matched.name.is_empty() { "unnamed" } else { &matched.name },
                    matched.geo.lat,
                    matched.geo.lon,
                    matched.distance_m
                ));
                if !matched.address_hint.is_empty() {
                    output.kv("Address", &matched.address_hint);
                }
                output.kv("OSM ID", matched.source_id);
            }
        }
        None => {
            output.info(format!("No building within {} m", max_distance));
        }
    }

    Ok(())
}
