//! Build command: turn a reference manifest into index artifacts

use crate::cli::BuildArgs;
use crate::output::OutputWriter;
use anyhow::{bail, Context, Result};
use geolens_core::config::GeoLensConfig;
use geolens_core::models::{Embedding, EntryMetadata, GeoPoint, IndexEntry};
use geolens_index::{persist, ImageIndex};
use serde::Deserialize;
use std::fs;

/// One manifest line: a geotagged reference image with its embedding
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    lat: f64,
    lon: f64,
    source_id: String,
    image_ref: String,
    embedding: Vec<f32>,
}

pub fn execute(args: BuildArgs, config: &GeoLensConfig, output: &OutputWriter) -> Result<()> {
    let index_path = config.index_path();
    let metadata_path = config.metadata_path();

    if (index_path.exists() || metadata_path.exists()) && !args.force {
        bail!(
            "Index artifacts already exist at {}. Use --force to rebuild.",
            index_path.parent().map(|p| p.display().to_string()).unwrap_or_default()
        );
    }

    let content = fs::read_to_string(&args.manifest)
        .with_context(|| format!("Failed to read manifest {}", args.manifest.display()))?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let parsed: ManifestEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                output.warning(format!("Skipping manifest line {}: {}", number + 1, e));
                skipped += 1;
                continue;
            }
        };

        let geo = GeoPoint::new(parsed.lat, parsed.lon);
        if !geo.is_valid() {
            output.warning(format!(
                "Skipping manifest line {}: coordinates out of range",
                number + 1
            ));
            skipped += 1;
            continue;
        }
        if parsed.embedding.len() != config.embedding_dim {
            output.warning(format!(
                "Skipping manifest line {}: embedding dimension {} (expected {})",
                number + 1,
                parsed.embedding.len(),
                config.embedding_dim
            ));
            skipped += 1;
            continue;
        }

        // Stored vectors must be unit length for inner-product scoring
        entries.push(IndexEntry {
            embedding: Embedding::new(parsed.embedding).normalized(),
            metadata: EntryMetadata {
                geo,
                source_id: parsed.source_id,
                image_ref: parsed.image_ref,
            },
        });
    }

    if entries.is_empty() {
        bail!("Manifest contained no usable entries");
    }

    output.info(format!("Building index from {} entries", entries.len()));
    let index = ImageIndex::build(entries)?;

    persist::save(&index, &index_path, &metadata_path)?;

    output.success(format!(
        "Index built: {} entries ({}), artifacts in {}",
        index.len(),
        if index.is_partitioned() { "partitioned" } else { "flat" },
        index_path.parent().map(|p| p.display().to_string()).unwrap_or_default()
    ));
    if skipped > 0 {
        output.warning(format!("{} manifest lines were skipped", skipped));
    }

    Ok(())
}
