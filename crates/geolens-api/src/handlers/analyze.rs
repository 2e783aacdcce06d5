use std::sync::Arc;

use axum::{extract::Multipart, extract::State, Json};
use uuid::Uuid;

use crate::dto::AnalyzeResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound on accepted image uploads
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (filename, data) = extract_image(&mut multipart).await?;

    tracing::info!(filename = %filename, size = data.len(), "Analyzing uploaded photo");

    let result = state.predictor.predict(&data).await;
    let analysis_id = Uuid::new_v4().to_string();

    Ok(Json(AnalyzeResponse {
        analysis_id,
        best: result.best,
        confidence: result.confidence,
        clusters: result.clusters,
        building_match: result.building_match,
    }))
}

async fn extract_image(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::bad_request("Failed to parse multipart form").with_details(e.to_string())
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" || name == "file" {
            let filename = field.file_name().unwrap_or("upload.jpg").to_string();
            validate_extension(&filename)?;

            let data = field.bytes().await.map_err(|e| {
                ApiError::bad_request("Failed to read image data").with_details(e.to_string())
            })?;

            if data.is_empty() {
                return Err(ApiError::bad_request("Uploaded image is empty"));
            }
            if data.len() > MAX_UPLOAD_BYTES {
                return Err(ApiError::payload_too_large(format!(
                    "Image exceeds the {} MB upload limit",
                    MAX_UPLOAD_BYTES / (1024 * 1024)
                )));
            }

            return Ok((filename, data.to_vec()));
        }
    }

    Err(ApiError::bad_request("No image provided")
        .with_details("Expected an 'image' field in the multipart form"))
}

fn validate_extension(filename: &str) -> Result<(), ApiError> {
    let extension = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ApiError::unsupported_media_type(format!(
            "Unsupported image type '{}', expected one of: {}",
            extension,
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_allowlist() {
        assert!(validate_extension("photo.jpg").is_ok());
        assert!(validate_extension("photo.JPEG").is_ok());
        assert!(validate_extension("photo.webp").is_ok());
        assert!(validate_extension("document.pdf").is_err());
        assert!(validate_extension("no_extension").is_err());
    }
}
