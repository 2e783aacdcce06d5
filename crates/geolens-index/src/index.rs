//! The vector similarity index

use geolens_core::error::{GeoLensError, Result};
use geolens_core::models::{Candidate, Embedding, EntryMetadata, IndexEntry};
use serde::{Deserialize, Serialize};

use crate::kmeans;

/// Corpora at or below this size use an exhaustive flat scan. Above it,
/// a partitioned index is trained for sub-linear queries.
pub const FLAT_SCAN_LIMIT: usize = 10_000;

/// Upper bound on the number of partitions
const MAX_PARTITIONS: usize = 256;

/// Partitions probed per query. More than the quantizer's single nearest
/// list, so the partitioned index stays within negligible accuracy loss of
/// the flat scan.
const NPROBE: usize = 4;

const TRAIN_ITERATIONS: usize = 25;
const TRAIN_SEED: u64 = 0x67656f_6c656e73;

/// Internal index layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum IndexStructure {
    /// Exhaustive scan over all vectors
    Flat,
    /// Inverted lists under a k-means coarse quantizer
    Partitioned { centroids: Vec<Vec<f32>>, lists: Vec<Vec<usize>> },
}

/// Similarity index over geotagged reference image embeddings.
///
/// Entries are appended at build time and never mutated. Queries score by
/// inner product, which equals cosine similarity for L2-normalized vectors.
#[derive(Debug, Clone)]
pub struct ImageIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<EntryMetadata>,
    structure: IndexStructure,
}

impl ImageIndex {
    /// Create an empty flat index
    pub fn new(dimension: usize) -> Self {
        Self { dimension, vectors: Vec::new(), metadata: Vec::new(), structure: IndexStructure::Flat }
    }

    /// Build an index from a full corpus, choosing the layout by corpus
    /// size. The partitioned quantizer is trained before the first insert.
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self> {
        let dimension = entries.first().map(|e| e.embedding.dimension()).unwrap_or(0);
        let mut index = Self::new(dimension);

        if entries.len() > FLAT_SCAN_LIMIT {
            let training: Vec<Vec<f32>> =
                entries.iter().map(|e| e.embedding.0.clone()).collect();
            let nlist =
                ((entries.len() as f64).sqrt() as usize).clamp(1, MAX_PARTITIONS);

            tracing::info!(
                vectors = entries.len(),
                partitions = nlist,
                "Training partitioned index quantizer"
            );
            let centroids = kmeans::train(&training, nlist, TRAIN_ITERATIONS, TRAIN_SEED);
            let lists = vec![Vec::new(); centroids.len()];
            index.structure = IndexStructure::Partitioned { centroids, lists };
        }

        index.insert_batch(entries)?;
        Ok(index)
    }

    /// Append a batch of entries
    pub fn insert_batch(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in entries {
            if self.dimension == 0 {
                self.dimension = entry.embedding.dimension();
            }
            if entry.embedding.dimension() != self.dimension {
                return Err(GeoLensError::DimensionMismatch {
                    expected: self.dimension,
                    actual: entry.embedding.dimension(),
                });
            }

            let id = self.vectors.len();
            match &mut self.structure {
                IndexStructure::Flat => {}
                IndexStructure::Partitioned { centroids, lists } => {
                    if centroids.is_empty() {
                        return Err(GeoLensError::IndexNotTrained);
                    }
                    let list = kmeans::nearest_centroid(&entry.embedding.0, centroids);
                    lists[list].push(id);
                }
            }
            self.vectors.push(entry.embedding.0);
            self.metadata.push(entry.metadata);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Whether the index can serve queries. An empty index is
    /// "unavailable", not an error.
    pub fn is_available(&self) -> bool {
        !self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_partitioned(&self) -> bool {
        matches!(self.structure, IndexStructure::Partitioned { .. })
    }

    /// Top-K nearest neighbors by descending inner-product similarity.
    /// `top_k` is clamped to the number of stored entries; an empty or
    /// mismatched query yields an empty result.
    pub fn search(&self, query: &Embedding, top_k: usize) -> Vec<Candidate> {
        if !self.is_available() || top_k == 0 {
            return Vec::new();
        }
        if query.dimension() != self.dimension {
            tracing::warn!(
                expected = self.dimension,
                actual = query.dimension(),
                "Query embedding dimension mismatch, skipping search"
            );
            return Vec::new();
        }

        let top_k = top_k.min(self.vectors.len());

        let mut scored: Vec<(usize, f32)> = match &self.structure {
            IndexStructure::Flat => self
                .vectors
                .iter()
                .enumerate()
                .map(|(i, v)| (i, query.dot(v)))
                .collect(),
            IndexStructure::Partitioned { centroids, lists } => {
                kmeans::nearest_centroids(&query.0, centroids, NPROBE)
                    .into_iter()
                    .flat_map(|list| lists[list].iter().copied())
                    .map(|i| (i, query.dot(&self.vectors[i])))
                    .collect()
            }
        };

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (id, similarity))| Candidate {
                geo: self.metadata[id].geo,
                similarity: similarity.clamp(0.0, 1.0),
                rank: rank + 1,
                metadata: self.metadata[id].clone(),
            })
            .collect()
    }

    pub(crate) fn into_parts(self) -> (usize, Vec<Vec<f32>>, Vec<EntryMetadata>, IndexStructure) {
        (self.dimension, self.vectors, self.metadata, self.structure)
    }

    pub(crate) fn from_parts(
        dimension: usize,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<EntryMetadata>,
        structure: IndexStructure,
    ) -> Result<Self> {
        if vectors.len() != metadata.len() {
            return Err(GeoLensError::IndexMetadataMismatch {
                vectors: vectors.len(),
                records: metadata.len(),
            });
        }
        Ok(Self { dimension, vectors, metadata, structure })
    }

    pub(crate) fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub(crate) fn metadata(&self) -> &[EntryMetadata] {
        &self.metadata
    }

    pub(crate) fn structure(&self) -> &IndexStructure {
        &self.structure
    }
}
