use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::MissingSecret;
use crate::documents::DocumentError;
use crate::llm_client::LlmError;
use crate::render::RenderError;
use crate::similarity::SimilarityError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(#[from] MissingSecret),

    #[error("Similarity error: {0}")]
    Similarity(#[from] SimilarityError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::UnsupportedFormat(ext) => AppError::UnsupportedFormat(ext),
            DocumentError::Extraction(msg) => AppError::Extraction(msg),
            DocumentError::Empty => AppError::Extraction(DocumentError::Empty.to_string()),
            DocumentError::Io(io) => {
                AppError::Internal(anyhow::Error::new(io).context("Document I/O failed"))
            }
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::UnsupportedProvider(tag) => AppError::UnsupportedProvider(tag),
            LlmError::MissingSecret(secret) => AppError::Config(secret),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnsupportedFormat(_) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FORMAT",
                "File type not allowed. Please upload a PDF or DOCX file.".to_string(),
            ),
            AppError::UnsupportedProvider(tag) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_PROVIDER",
                format!("Unsupported provider: {tag}"),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "The file is too large".to_string(),
            ),
            AppError::Extraction(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                format!("Error processing resume: {msg}"),
            ),
            AppError::Config(e) => {
                tracing::error!("Configuration error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "The service is missing required configuration".to_string(),
                )
            }
            AppError::Similarity(e) => {
                tracing::error!("Similarity error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SIMILARITY_ERROR",
                    "Could not compute the ATS score".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    "An error occurred while generating the downloadable file".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
