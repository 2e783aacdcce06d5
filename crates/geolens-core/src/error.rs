//! Error types for GeoLens

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoLensError {
    // Index artifact errors (configuration-fatal at startup)
    #[error("Index artifact missing: {path}. The index and metadata files must be deployed together")]
    IndexArtifactMissing { path: PathBuf },

    #[error("Index/metadata mismatch: {vectors} vectors but {records} metadata records")]
    IndexMetadataMismatch { vectors: usize, records: usize },

    #[error("Partitioned index used before training")]
    IndexNotTrained,

    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Model errors
    #[error("Model unavailable: {reason}. Try: {remediation}")]
    ModelUnavailable { reason: String, remediation: String },

    // Geometry errors
    #[error("Projection to EPSG:{epsg} failed: {reason}")]
    Projection { epsg: u32, reason: String },

    #[error("Footprint fetch failed: {reason}")]
    FootprintFetch { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, GeoLensError>;
