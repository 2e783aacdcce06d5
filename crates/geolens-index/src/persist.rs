//! Index persistence
//!
//! The index persists as two co-located artifacts: the serialized index
//! structure, and a parallel metadata record list whose position
//! corresponds 1:1 to entry order. Loading one without the other is a
//! configuration error at startup, not a per-query condition.

use geolens_core::error::{GeoLensError, Result};
use geolens_core::models::EntryMetadata;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::index::{ImageIndex, IndexStructure};

/// On-disk form of the index structure artifact
#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    structure: IndexStructure,
}

/// Write both artifacts. Parent directories are created as needed.
pub fn save(index: &ImageIndex, index_path: &Path, metadata_path: &Path) -> Result<()> {
    if let Some(parent) = index_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Some(parent) = metadata_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let artifact = IndexArtifact {
        dimension: index.dimension(),
        vectors: index.vectors().to_vec(),
        structure: index.structure().clone(),
    };

    let writer = BufWriter::new(File::create(index_path)?);
    serde_json::to_writer(writer, &artifact)
        .map_err(|e| GeoLensError::Serialization(e.to_string()))?;

    let writer = BufWriter::new(File::create(metadata_path)?);
    serde_json::to_writer(writer, index.metadata())
        .map_err(|e| GeoLensError::Serialization(e.to_string()))?;

    tracing::info!(
        vectors = index.len(),
        index = %index_path.display(),
        metadata = %metadata_path.display(),
        "Saved index artifacts"
    );
    Ok(())
}

/// Load both artifacts. Fails fast when either file is absent or the
/// vector and metadata counts disagree, since that indicates a corrupt
/// deployment rather than a transient condition.
pub fn load(index_path: &Path, metadata_path: &Path) -> Result<ImageIndex> {
    if !index_path.exists() {
        return Err(GeoLensError::IndexArtifactMissing { path: index_path.to_path_buf() });
    }
    if !metadata_path.exists() {
        return Err(GeoLensError::IndexArtifactMissing { path: metadata_path.to_path_buf() });
    }

    let reader = BufReader::new(File::open(index_path)?);
    let artifact: IndexArtifact = serde_json::from_reader(reader)
        .map_err(|e| GeoLensError::Serialization(format!("index artifact: {}", e)))?;

    let reader = BufReader::new(File::open(metadata_path)?);
    let metadata: Vec<EntryMetadata> = serde_json::from_reader(reader)
        .map_err(|e| GeoLensError::Serialization(format!("metadata artifact: {}", e)))?;

    let index =
        ImageIndex::from_parts(artifact.dimension, artifact.vectors, metadata, artifact.structure)?;

    tracing::info!(vectors = index.len(), dimension = index.dimension(), "Loaded index artifacts");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolens_core::models::{Embedding, GeoPoint, IndexEntry};

    fn sample_index() -> ImageIndex {
        ImageIndex::build(vec![
            IndexEntry {
                embedding: Embedding::new(vec![1.0, 0.0]),
                metadata: EntryMetadata {
                    geo: GeoPoint::new(38.70, -9.14),
                    source_id: "a".to_string(),
                    image_ref: "images/a.jpg".to_string(),
                },
            },
            IndexEntry {
                embedding: Embedding::new(vec![0.0, 1.0]),
                metadata: EntryMetadata {
                    geo: GeoPoint::new(41.15, -8.61),
                    source_id: "b".to_string(),
                    image_ref: "images/b.jpg".to_string(),
                },
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("region.index.json");
        let metadata_path = dir.path().join("region.meta.json");

        let index = sample_index();
        save(&index, &index_path, &metadata_path).unwrap();

        let loaded = load(&index_path, &metadata_path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), 2);

        let results = loaded.search(&Embedding::new(vec![1.0, 0.0]), 1);
        assert_eq!(results[0].metadata.source_id, "a");
    }

    #[test]
    fn test_missing_metadata_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("region.index.json");
        let metadata_path = dir.path().join("region.meta.json");

        save(&sample_index(), &index_path, &metadata_path).unwrap();
        fs::remove_file(&metadata_path).unwrap();

        let err = load(&index_path, &metadata_path);
        assert!(matches!(err, Err(GeoLensError::IndexArtifactMissing { .. })));
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("region.index.json");
        let metadata_path = dir.path().join("region.meta.json");

        save(&sample_index(), &index_path, &metadata_path).unwrap();
        fs::remove_file(&index_path).unwrap();

        let err = load(&index_path, &metadata_path);
        assert!(matches!(err, Err(GeoLensError::IndexArtifactMissing { .. })));
    }

    #[test]
    fn test_length_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("region.index.json");
        let metadata_path = dir.path().join("region.meta.json");

        save(&sample_index(), &index_path, &metadata_path).unwrap();

        // Truncate the metadata list to break the 1:1 correspondence
        let records: Vec<EntryMetadata> =
            serde_json::from_str(&fs::read_to_string(&metadata_path).unwrap()).unwrap();
        fs::write(&metadata_path, serde_json::to_string(&records[..1]).unwrap()).unwrap();

        let err = load(&index_path, &metadata_path);
        assert!(matches!(err, Err(GeoLensError::IndexMetadataMismatch { .. })));
    }
}
