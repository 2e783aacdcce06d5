use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use geolens_core::models::{FeedbackRecord, GeoPoint};

use crate::dto::{FeedbackRequest, FeedbackResponse};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn handle_feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let corrected = GeoPoint::new(request.corrected_lat, request.corrected_lon);
    if !corrected.is_valid() {
        return Err(ApiError::bad_request("Corrected coordinates are out of range"));
    }

    if request.predicted_lat.is_some() != request.predicted_lon.is_some() {
        return Err(ApiError::bad_request(
            "predicted_lat and predicted_lon must be provided together",
        ));
    }

    let record = FeedbackRecord {
        timestamp: Utc::now(),
        analysis_id: request.analysis_id.clone(),
        predicted_lat: request.predicted_lat,
        predicted_lon: request.predicted_lon,
        correct_lat: request.corrected_lat,
        correct_lon: request.corrected_lon,
        notes: request.note.unwrap_or_default(),
    };

    state
        .feedback
        .append(&record)
        .map_err(|e| ApiError::internal("Failed to record feedback").with_details(e.to_string()))?;

    Ok(Json(FeedbackResponse::recorded(&request.analysis_id)))
}
