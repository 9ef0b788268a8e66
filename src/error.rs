use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::path::PathBuf;
use thiserror::Error;

use crate::render::{render_page, PageView};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model from {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced no output")]
    EmptyOutput,

    #[error("model output {0} is not a probability")]
    OutOfRange(f64),
}

/// Request-level failures. Every variant is rendered back to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    #[error("unsupported image: {0}")]
    UnsupportedImageFormat(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),

    #[error("could not store upload: {0}")]
    Storage(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name used by the JSON endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidUpload(_) => "invalid_upload",
            AppError::UploadTooLarge { .. } => "upload_too_large",
            AppError::UnsupportedImageFormat(_) => "unsupported_image_format",
            AppError::ModelUnavailable(_) => "model_unavailable",
            AppError::Storage(_) => "storage",
            AppError::Internal(_) => "internal",
        }
    }

    fn log(&self) {
        if self.status_code().is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::warn!("Rejected request: {}", self);
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedImageFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        HttpResponse::build(self.status_code())
            .content_type(ContentType::html())
            .body(render_page(&PageView::Error {
                message: &self.to_string(),
            }))
    }
}

/// Wraps [`AppError`] for the JSON endpoint so failures come back as JSON.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub AppError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.0.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        self.0.log();
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }))
    }
}
