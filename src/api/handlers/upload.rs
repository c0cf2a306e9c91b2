use crate::AppState;
use crate::api::error::AppError;
use crate::services::upload_service::error::NO_FILE_PART;
use crate::services::upload_service::{IngestError, UploadRequest};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
}

/// Multipart form accepted by `POST /upload`
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct UploadForm {
    /// Expected size of `file` in bytes; must precede the file part
    pub total_size: Option<u64>,
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Missing or invalid file part", body = UploadResponse),
        (status = 413, description = "Request body too large", body = UploadResponse),
        (status = 500, description = "File could not be stored", body = UploadResponse)
    ),
    tag = "upload"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut declared_size: Option<u64> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "total_size" {
            let text = field.text().await.map_err(multipart_error)?;
            declared_size = Some(text.trim().parse().map_err(|_| {
                AppError::BadRequest(format!("Invalid total_size '{}'", text.trim()))
            })?);
        } else if name == "file" {
            let filename = field.file_name().map(|s| s.to_string());
            let part_length = field
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());

            let body_with_io_error = field.map_err(std::io::Error::other);
            let reader = StreamReader::new(body_with_io_error);

            state
                .upload_service
                .ingest(UploadRequest::new(
                    filename,
                    declared_size.or(part_length),
                    reader,
                ))
                .await?;

            return Ok(Json(UploadResponse {
                message: "File uploaded".to_string(),
            }));
        }
    }

    tracing::warn!("{}", NO_FILE_PART);
    Err(IngestError::Missing(NO_FILE_PART).into())
}

/// Every method other than POST on `/upload`
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed("POST")
}
