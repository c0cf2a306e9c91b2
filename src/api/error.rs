use crate::services::upload_service::IngestError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] IngestError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Method Not Allowed, allowed: {0}")]
    MethodNotAllowed(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Logged with full detail where it was raised
            AppError::Upload(e) => (e.status_code(), e.public_message()),
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::PayloadTooLarge(msg) => {
                tracing::warn!("Payload too large: {}", msg);
                (StatusCode::PAYLOAD_TOO_LARGE, msg.clone())
            }
            AppError::MethodNotAllowed(allowed) => {
                tracing::warn!("Method not allowed, allowed: {}", allowed);
                (
                    StatusCode::METHOD_NOT_ALLOWED,
                    format!("Method not allowed. Allowed methods: {}", allowed),
                )
            }
        };

        let body = Json(json!({
            "message": message
        }));

        let mut response = (status, body).into_response();
        if let AppError::MethodNotAllowed(allowed) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allowed));
        }
        response
    }
}
