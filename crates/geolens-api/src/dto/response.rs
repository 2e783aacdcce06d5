use chrono::{DateTime, Utc};
use geolens_core::models::{BestPrediction, BuildingMatch, Cluster};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub started_at: DateTime<Utc>,
    pub index_entries: usize,
    pub index_partitioned: bool,
    pub inference_attached: bool,
}

/// Analysis result response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<BestPrediction>,
    pub confidence: f64,
    pub clusters: Vec<Cluster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_match: Option<BuildingMatch>,
}

/// Feedback acknowledgement
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

impl FeedbackResponse {
    pub fn recorded(analysis_id: &str) -> Self {
        Self {
            success: true,
            message: format!("Correction recorded for analysis {}", analysis_id),
        }
    }
}
