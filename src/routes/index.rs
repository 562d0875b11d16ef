use crate::pages::{self, IndexPage};
use crate::server::SharedState;
use crate::storage;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

const UNSUPPORTED_FORMAT: &str =
    "File format not supported. Please upload a .jpg, .jpeg or .png file.";

/// Infrastructure failures around the upload flow. Validation and
/// detection failures are not errors at this level; they render as a
/// normal page with an error message.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Multipart decode failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    StoreUpload(#[source] std::io::Error),
    #[error("Failed to store result image: {0}")]
    StoreResult(#[source] image::ImageError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "upload handling failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong while handling the upload",
        )
            .into_response()
    }
}

pub async fn upload_form() -> Html<String> {
    Html(pages::index(&IndexPage::default()))
}

#[instrument(skip(state, multipart))]
pub async fn handle_upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Html<String>, UploadError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let data = field.bytes().await?;
        upload = Some((filename, data));
        break;
    }

    let Some((filename, data)) = upload else {
        state.metrics.record_upload("rejected");
        return Ok(error_page("No file part"));
    };

    if filename.is_empty() {
        state.metrics.record_upload("rejected");
        return Ok(error_page("No selected file"));
    }

    if !storage::allowed_file(&filename) {
        state.metrics.record_upload("rejected");
        return Ok(error_page(UNSUPPORTED_FORMAT));
    }

    let unique = state.assets.unique_filename(&filename);
    let saved_path = state
        .assets
        .save_upload(&unique, &data)
        .await
        .map_err(UploadError::StoreUpload)?;

    let started = Instant::now();
    let detection = state.detector.detect_vehicles(&saved_path);
    state
        .metrics
        .record_detection_duration(started.elapsed().as_millis() as u64);

    match detection {
        Ok(detection) => {
            let result_filename = state.assets.result_filename(&unique);
            detection
                .image
                .save(state.assets.path_for(&result_filename))
                .map_err(UploadError::StoreResult)?;

            state.metrics.record_upload("processed");
            state
                .metrics
                .record_vehicles_detected(detection.vehicle_count as u64);
            tracing::info!(
                vehicle_count = detection.vehicle_count,
                result = %result_filename,
                "image processed"
            );

            let result_url = state.assets.static_url(&result_filename);
            Ok(Html(pages::index(&IndexPage {
                error: None,
                result_image: Some(&result_url),
                vehicle_count: detection.vehicle_count,
            })))
        }
        Err(err) => {
            state.metrics.record_upload("failed");
            tracing::error!(
                error = ?err,
                upload = %saved_path.display(),
                "vehicle detection failed"
            );
            Ok(error_page(&format!("Error processing image: {}", err)))
        }
    }
}

fn error_page(message: &str) -> Html<String> {
    Html(pages::index(&IndexPage {
        error: Some(message),
        ..Default::default()
    }))
}
