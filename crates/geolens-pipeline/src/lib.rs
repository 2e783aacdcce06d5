//! GeoLens Pipeline - the hybrid prediction core
//!
//! Orchestrates the coarse locator, retrieval index, candidate clusterer,
//! selection cascade, building snapper, and result cache into a single
//! consensus prediction with a calibrated confidence.

pub mod cache;
pub mod cluster;
pub mod feedback;
pub mod predictor;

pub use cache::{content_hash, ResultCache};
pub use cluster::{cluster_candidates, ClusterOutcome};
pub use feedback::FeedbackLog;
pub use predictor::HybridPredictor;
