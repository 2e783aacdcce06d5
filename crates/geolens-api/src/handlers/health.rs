use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "geolens-api",
        started_at: state.started_at,
        index_entries: state.index_entries,
        index_partitioned: state.index_partitioned,
        inference_attached: state.inference_attached,
    })
}
