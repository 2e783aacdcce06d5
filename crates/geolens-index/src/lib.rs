//! GeoLens Index - vector similarity search over geotagged reference images
//!
//! Stores L2-normalized embeddings with their geotags and answers top-K
//! nearest-neighbor queries by inner product. Small corpora use an
//! exhaustive flat scan; large corpora use a partitioned index with a
//! k-means-trained coarse quantizer.

pub mod index;
pub mod kmeans;
pub mod persist;

pub use index::{ImageIndex, FLAT_SCAN_LIMIT};
