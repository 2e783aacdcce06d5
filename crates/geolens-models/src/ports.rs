//! Model port definitions

use async_trait::async_trait;
use geolens_core::error::Result;
use geolens_core::models::{CoarsePrediction, Embedding};

/// Port for the whole-image coarse locator
///
/// Implementations must tolerate model-unavailable by returning a degraded
/// low-confidence default centered on the target region rather than erroring.
#[async_trait]
pub trait CoarseLocator: Send + Sync {
    /// Predict a coarse location for raw image bytes
    async fn predict(&self, image: &[u8]) -> Result<CoarsePrediction>;

    /// Name/identifier of the underlying model
    fn model_name(&self) -> &str;
}

/// Port for the region-specific image embedder
///
/// A zero-vector result means "no signal": callers must skip similarity
/// search rather than querying with it.
#[async_trait]
pub trait RegionEmbedder: Send + Sync {
    /// Produce an L2-normalized embedding for raw image bytes
    async fn embed(&self, image: &[u8]) -> Result<Embedding>;

    /// Dimensionality of produced embeddings
    fn dimensions(&self) -> usize;

    /// Name/identifier of the underlying model
    fn model_name(&self) -> &str;
}
