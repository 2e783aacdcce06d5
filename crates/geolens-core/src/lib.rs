//! GeoLens Core - Domain models, configuration, and error types
//!
//! This crate contains the shared domain model for the GeoLens hybrid
//! geolocation pipeline: geographic primitives, retrieval candidates,
//! prediction results, and the region/pipeline configuration.

pub mod config;
pub mod error;
pub mod models;

pub use error::{GeoLensError, Result};
