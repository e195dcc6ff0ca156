use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

pub const INFERENCE_FAILED: &str = "Inference failed";

/// Traduce errores de dominio a respuestas `{"detail": ...}`.
///
/// Los errores de entrada devuelven su causa al cliente; los de inferencia
/// solo devuelven un mensaje genérico (la causa ya quedó en los logs).
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Multipart(MultipartError),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Domain(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Domain(DomainError::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(DomainError::InferenceFailed(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INFERENCE_FAILED.to_string())
            }
            ApiError::Domain(other) => {
                error!("❌ Error interno: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::Multipart(e) => (e.status(), format!("Invalid multipart body: {}", e.body_text())),
        };
        (status, Json(ErrorResponse::new(detail))).into_response()
    }
}
