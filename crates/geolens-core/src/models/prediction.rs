//! Prediction pipeline result types
//!
//! These are the ephemeral, per-request values flowing through the hybrid
//! predictor: retrieval candidates, spatial clusters, the coarse guess, and
//! the final consensus result.

use serde::{Deserialize, Serialize};

use super::geometry::GeoPoint;
use super::index::EntryMetadata;

/// A retrieval hit from the vector similarity index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub geo: GeoPoint,

    /// Inner-product similarity of normalized embeddings, in [0, 1]
    pub similarity: f32,

    /// 1-based rank within the search results
    pub rank: usize,

    pub metadata: EntryMetadata,
}

/// A spatially dense group of retrieval candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Similarity-weighted centroid of all member coordinates
    pub center: GeoPoint,

    /// Total member count, including members beyond the retained top-N
    pub size: usize,

    /// Mean similarity across all members
    pub avg_similarity: f32,

    /// Highest-similarity members, at most five, descending by similarity
    pub members: Vec<Candidate>,
}

/// One ranked guess from the coarse locator
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoarseGuess {
    pub geo: GeoPoint,
    pub confidence: f64,
}

/// Whole-image location guess with no retrieval context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarsePrediction {
    pub geo: GeoPoint,
    pub confidence: f64,
    pub top_k: Vec<CoarseGuess>,
}

/// Nearest building footprint for a predicted point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingMatch {
    /// Footprint centroid in geographic coordinates
    pub geo: GeoPoint,

    /// Distance from the query point, in projected meters
    pub distance_m: f64,

    pub building_kind: String,
    pub name: String,
    pub address_hint: String,
    pub source_id: i64,
}

/// Provenance of the selected prediction, in cascade priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    /// Strong spatial consensus among retrieval matches
    RetrievalCluster,
    /// Confident whole-image guess
    Coarse,
    /// Best single retrieval match, no cluster support
    SingleRetrieval,
    /// Low-confidence whole-image guess, last resort
    CoarseFallback,
}

impl std::fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PredictionMethod::RetrievalCluster => "retrieval_cluster",
            PredictionMethod::Coarse => "coarse",
            PredictionMethod::SingleRetrieval => "single_retrieval",
            PredictionMethod::CoarseFallback => "coarse_fallback",
        };
        f.write_str(s)
    }
}

/// The single point chosen by the selection cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestPrediction {
    pub point: GeoPoint,
    pub method: PredictionMethod,

    /// True once the point has been replaced by a building footprint centroid
    pub snapped: bool,

    /// Supporting cluster size, for `retrieval_cluster`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_size: Option<usize>,

    /// Supporting similarity, for retrieval-backed methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    /// Coarse model confidence, for coarse-backed methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coarse_confidence: Option<f64>,
}

/// Final output of the hybrid prediction pipeline.
/// Created once per request, immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Selected point with provenance, or `None` when no signal was available
    pub best: Option<BestPrediction>,

    /// Calibrated confidence in [0, 0.95], rounded to 3 decimals
    pub confidence: f64,

    /// Ranked clusters from the retrieval phase
    pub clusters: Vec<Cluster>,

    /// Building the point was snapped to, if any
    pub building_match: Option<BuildingMatch>,
}

impl PredictionResult {
    /// An empty result: no signal, confidence zero. This is a valid
    /// terminal outcome, not an error.
    pub fn empty() -> Self {
        Self { best: None, confidence: 0.0, clusters: Vec::new(), building_match: None }
    }

    pub fn method(&self) -> Option<PredictionMethod> {
        self.best.as_ref().map(|b| b.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_snake_case() {
        let json = serde_json::to_string(&PredictionMethod::RetrievalCluster).unwrap();
        assert_eq!(json, "\"retrieval_cluster\"");
        let json = serde_json::to_string(&PredictionMethod::CoarseFallback).unwrap();
        assert_eq!(json, "\"coarse_fallback\"");
    }

    #[test]
    fn test_empty_result() {
        let result = PredictionResult::empty();
        assert!(result.best.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.method().is_none());
    }
}
