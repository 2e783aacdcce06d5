use serde::Deserialize;

/// User correction for a previous analysis
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub analysis_id: String,

    /// Point the pipeline originally returned, if any
    pub predicted_lat: Option<f64>,
    pub predicted_lon: Option<f64>,

    /// Where the photo was actually taken
    pub corrected_lat: f64,
    pub corrected_lon: f64,

    pub note: Option<String>,
}
