//! GeoLens Models - ports to the external embedding and coarse-location models
//!
//! The underlying image models are opaque scorers behind a fixed
//! request/response contract. The pipeline consumes them through the
//! `CoarseLocator` and `RegionEmbedder` ports so it can be exercised with
//! deterministic stub implementations in tests.

pub mod ports;
pub mod remote;

pub use ports::{CoarseLocator, RegionEmbedder};
pub use remote::{RemoteCoarseLocator, RemoteRegionEmbedder};
