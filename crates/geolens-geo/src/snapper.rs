//! Building footprint snapping
//!
//! Given a predicted point, find the nearest known building footprint
//! within a bounded radius and return its centroid. Footprints come from
//! an external provider and are cached per quantized spatial cell; a cell
//! miss triggers a fetch of twice the snap radius around the point.
//!
//! Concurrent misses on the same cell may both fetch and both write. The
//! write is an idempotent overwrite (temp file + rename), so this race is
//! tolerated instead of serialized behind a per-cell lock.

use async_trait::async_trait;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Distance, Euclidean, Polygon};
use geolens_core::error::Result;
use geolens_core::models::{BuildingMatch, GeoPoint};
use rstar::{RTree, RTreeObject, AABB};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::footprint::{self, Footprint};
use crate::projection;

/// Port for the external footprint provider
#[async_trait]
pub trait FootprintSource: Send + Sync {
    /// Fetch all building footprints within `radius_m` of `center`
    async fn fetch_area(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<Footprint>>;
}

/// Footprint with its planar envelope, for R-tree prefiltering
struct ProjectedFootprint {
    idx: usize,
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ProjectedFootprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

pub struct BuildingSnapper {
    cache_dir: PathBuf,
    source: Arc<dyn FootprintSource>,
    planar_epsg: u32,
}

impl BuildingSnapper {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        source: Arc<dyn FootprintSource>,
        planar_epsg: u32,
    ) -> Self {
        Self { cache_dir: cache_dir.into(), source, planar_epsg }
    }

    /// Snap a point to the nearest building footprint within
    /// `max_distance_m`. This is a non-critical enrichment step: any
    /// failure (fetch, projection, cache) degrades to `None`.
    pub async fn snap(&self, point: GeoPoint, max_distance_m: f64) -> Option<BuildingMatch> {
        match self.snap_inner(point, max_distance_m).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(lat = point.lat, lon = point.lon, error = %e, "Building snap failed");
                None
            }
        }
    }

    async fn snap_inner(
        &self,
        point: GeoPoint,
        max_distance_m: f64,
    ) -> Result<Option<BuildingMatch>> {
        let fetch_radius_m = max_distance_m * 2.0;
        let footprints = self.load_cell(point, fetch_radius_m).await?;
        if footprints.is_empty() {
            return Ok(None);
        }

        // Threshold comparisons happen in planar meters, never in degrees
        let proj = projection::planar_projection(self.planar_epsg)?;
        let query = projection::project_point(&proj, &point, self.planar_epsg)?;

        let projected: Vec<ProjectedFootprint> = footprints
            .iter()
            .enumerate()
            .filter_map(|(idx, f)| {
                let polygon =
                    projection::project_polygon(&proj, &f.polygon, self.planar_epsg).ok()?;
                let rect = polygon.bounding_rect()?;
                Some(ProjectedFootprint {
                    idx,
                    polygon,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        let tree = RTree::bulk_load(projected);
        let search_envelope = AABB::from_corners(
            [query.x() - max_distance_m, query.y() - max_distance_m],
            [query.x() + max_distance_m, query.y() + max_distance_m],
        );

        let mut best: Option<(usize, f64)> = None;
        for candidate in tree.locate_in_envelope_intersecting(&search_envelope) {
            let distance = Euclidean.distance(&query, &candidate.polygon);
            if distance <= max_distance_m
                && best.map(|(_, d)| distance < d).unwrap_or(true)
            {
                best = Some((candidate.idx, distance));
            }
        }

        // No forced snap beyond the threshold
        let Some((idx, distance_m)) = best else {
            return Ok(None);
        };

        let footprint = &footprints[idx];
        // Centroid in geographic coordinates, not in the planar projection
        let Some(centroid) = footprint.centroid() else {
            return Ok(None);
        };

        Ok(Some(BuildingMatch {
            geo: centroid,
            distance_m,
            building_kind: footprint.kind.clone(),
            name: footprint.name.clone(),
            address_hint: footprint.address_hint(),
            source_id: footprint.osm_id,
        }))
    }

    /// Load footprints for the cell containing `point`, fetching and
    /// caching on miss. A corrupt cache file is treated as a miss and
    /// overwritten by the fresh fetch.
    async fn load_cell(&self, point: GeoPoint, fetch_radius_m: f64) -> Result<Vec<Footprint>> {
        let cache_file = self.cell_path(point, fetch_radius_m);

        if cache_file.exists() {
            match footprint::read_geojson(&cache_file) {
                Ok(footprints) => {
                    tracing::debug!(cell = %cache_file.display(), buildings = footprints.len(), "Footprint cache hit");
                    return Ok(footprints);
                }
                Err(e) => {
                    tracing::warn!(cell = %cache_file.display(), error = %e, "Corrupt footprint cache cell, refetching");
                }
            }
        }

        let footprints = self.source.fetch_area(point, fetch_radius_m).await?;
        if !footprints.is_empty() {
            if let Err(e) = self.write_cell(&cache_file, &footprints) {
                // Cache persistence is best-effort
                tracing::warn!(cell = %cache_file.display(), error = %e, "Failed to write footprint cache cell");
            }
        }
        Ok(footprints)
    }

    /// Cell key: coordinates quantized to 3 decimal places plus the
    /// integer fetch radius.
    fn cell_path(&self, point: GeoPoint, fetch_radius_m: f64) -> PathBuf {
        self.cache_dir.join(format!(
            "buildings_{:.3}_{:.3}_{}.geojson",
            point.lat, point.lon, fetch_radius_m as i64
        ))
    }

    fn write_cell(&self, path: &Path, footprints: &[Footprint]) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let content = footprint::to_geojson_string(footprints)?;

        // Rename makes concurrent overwrites of the same cell atomic
        let tmp = path.with_extension("geojson.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
