//! Reference index entry types

use serde::{Deserialize, Serialize};

use super::geometry::GeoPoint;

/// An L2-normalized embedding vector. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self(vector)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// An all-zero embedding means the embedder produced no signal.
    /// Searches against it must be skipped, not silently executed.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Inner product with another vector. Equals cosine similarity when
    /// both vectors are L2-normalized.
    pub fn dot(&self, other: &[f32]) -> f32 {
        self.0.iter().zip(other.iter()).map(|(a, b)| a * b).sum()
    }

    /// Return an L2-normalized copy. Zero vectors stay zero.
    pub fn normalized(&self) -> Self {
        let norm: f32 = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return self.clone();
        }
        Self(self.0.iter().map(|v| v / norm).collect())
    }
}

/// Metadata attached to each indexed reference image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Geotag of the reference image
    pub geo: GeoPoint,

    /// Identifier of the data source (e.g. collection run)
    pub source_id: String,

    /// Reference to the original image (path or URL)
    pub image_ref: String,
}

/// A single entry in the vector similarity index. Inserted at build time,
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Embedding,
    pub metadata: EntryMetadata,
}
