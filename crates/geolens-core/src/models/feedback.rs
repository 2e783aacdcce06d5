//! Human correction records for future retraining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One correction submitted for a prediction. Appended as a single line to
/// the durable feedback log; existing lines are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub analysis_id: String,
    pub predicted_lat: Option<f64>,
    pub predicted_lon: Option<f64>,
    pub correct_lat: f64,
    pub correct_lon: f64,
    #[serde(default)]
    pub notes: String,
}
