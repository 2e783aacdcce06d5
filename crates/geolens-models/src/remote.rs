//! HTTP clients for the inference sidecar
//!
//! The coarse locator and region embedder run in a separate inference
//! service. Both clients degrade on any transport or decoding failure:
//! the locator falls back to the region center at low confidence, the
//! embedder to a zero vector, and the pipeline carries on with the
//! remaining signals.

use async_trait::async_trait;
use geolens_core::error::{GeoLensError, Result};
use geolens_core::models::{CoarseGuess, CoarsePrediction, Embedding, GeoPoint};
use serde::Deserialize;
use std::time::Duration;

use crate::ports::{CoarseLocator, RegionEmbedder};

/// Confidence reported when the coarse model could not be reached
const FALLBACK_CONFIDENCE: f64 = 0.1;

fn build_client(connect_timeout: Duration, request_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|e| GeoLensError::ModelUnavailable {
            reason: format!("Failed to build HTTP client: {}", e),
            remediation: "Check TLS configuration".to_string(),
        })
}

/// Coarse locator served over HTTP
pub struct RemoteCoarseLocator {
    base_url: String,
    model: String,
    region_center: GeoPoint,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CoarseResponse {
    lat: f64,
    lon: f64,
    confidence: f64,
    #[serde(default)]
    top_k: Vec<CoarseResponseGuess>,
}

#[derive(Debug, Deserialize)]
struct CoarseResponseGuess {
    lat: f64,
    lon: f64,
    confidence: f64,
}

impl RemoteCoarseLocator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        region_center: GeoPoint,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            region_center,
            client: build_client(connect_timeout, request_timeout)?,
        })
    }

    /// The degraded default when no model output is available
    fn fallback(&self) -> CoarsePrediction {
        CoarsePrediction {
            geo: self.region_center,
            confidence: FALLBACK_CONFIDENCE,
            top_k: Vec::new(),
        }
    }

    async fn request(&self, image: &[u8]) -> std::result::Result<CoarseResponse, reqwest::Error> {
        self.client
            .post(format!("{}/v1/coarse/predict", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?
            .error_for_status()?
            .json::<CoarseResponse>()
            .await
    }
}

#[async_trait]
impl CoarseLocator for RemoteCoarseLocator {
    async fn predict(&self, image: &[u8]) -> Result<CoarsePrediction> {
        match self.request(image).await {
            Ok(response) => Ok(CoarsePrediction {
                geo: GeoPoint::new(response.lat, response.lon),
                confidence: response.confidence,
                top_k: response
                    .top_k
                    .into_iter()
                    .map(|g| CoarseGuess {
                        geo: GeoPoint::new(g.lat, g.lon),
                        confidence: g.confidence,
                    })
                    .collect(),
            }),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Coarse locator unavailable, using region-center fallback"
                );
                Ok(self.fallback())
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Region embedder served over HTTP
pub struct RemoteRegionEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl RemoteRegionEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            dimensions,
            client: build_client(connect_timeout, request_timeout)?,
        })
    }

    async fn request(&self, image: &[u8]) -> std::result::Result<EmbedResponse, reqwest::Error> {
        self.client
            .post(format!("{}/v1/embed", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?
            .error_for_status()?
            .json::<EmbedResponse>()
            .await
    }
}

#[async_trait]
impl RegionEmbedder for RemoteRegionEmbedder {
    async fn embed(&self, image: &[u8]) -> Result<Embedding> {
        match self.request(image).await {
            Ok(response) if response.embedding.len() == self.dimensions => {
                Ok(Embedding::new(response.embedding).normalized())
            }
            Ok(response) => {
                tracing::warn!(
                    expected = self.dimensions,
                    actual = response.embedding.len(),
                    "Embedder returned wrong dimension, treating as no signal"
                );
                Ok(Embedding::new(vec![0.0; self.dimensions]))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Embedder unavailable, returning zero vector");
                Ok(Embedding::new(vec![0.0; self.dimensions]))
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locator_falls_back_to_region_center() {
        // Unroutable port: the request fails fast and the fallback applies
        let locator = RemoteCoarseLocator::new(
            "http://127.0.0.1:1",
            "geoclip",
            GeoPoint::new(38.7223, -9.1393),
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .unwrap();

        let prediction = locator.predict(b"not an image").await.unwrap();
        assert_eq!(prediction.geo, GeoPoint::new(38.7223, -9.1393));
        assert_eq!(prediction.confidence, FALLBACK_CONFIDENCE);
        assert!(prediction.top_k.is_empty());
    }

    #[tokio::test]
    async fn test_embedder_falls_back_to_zero_vector() {
        let embedder = RemoteRegionEmbedder::new(
            "http://127.0.0.1:1",
            "region-clip",
            8,
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .unwrap();

        let embedding = embedder.embed(b"not an image").await.unwrap();
        assert_eq!(embedding.dimension(), 8);
        assert!(embedding.is_zero());
    }
}
