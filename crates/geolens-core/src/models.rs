pub mod feedback;
pub mod geometry;
pub mod index;
pub mod prediction;

pub use feedback::FeedbackRecord;
pub use geometry::{BoundingBox, GeoPoint};
pub use index::{Embedding, EntryMetadata, IndexEntry};
pub use prediction::{
    BestPrediction, BuildingMatch, Candidate, Cluster, CoarseGuess, CoarsePrediction,
    PredictionMethod, PredictionResult,
};
