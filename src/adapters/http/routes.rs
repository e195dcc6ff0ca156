use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::HealthResponse;
use crate::domain::{
    detection::DetectionResult,
    errors::DomainError,
    upload::{ensure_image_content_type, ImageUpload},
};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn detect(
    State(st): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Json<DetectionResult>, ApiError> {
    let mut upload: Option<ImageUpload> = None;
    let mut threshold: Option<f32> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                // Se rechaza por cabecera antes de leer el contenido de la parte.
                let content_type = field.content_type().map(str::to_owned);
                ensure_image_content_type(content_type.as_deref())?;
                let bytes = field.bytes().await?;
                upload = Some(ImageUpload { content_type, bytes: bytes.to_vec() });
            }
            "confidence_threshold" => {
                let text = field.text().await?;
                threshold = Some(parse_threshold(&text)?);
            }
            _ => {}
        }
    }

    let upload = upload
        .ok_or_else(|| DomainError::InvalidInput("Field 'image' is required".into()))?;
    let result = st.detection.detect(upload, threshold).await?;
    Ok(Json(result))
}

/// Sin validación de rango: cualquier valor finito llega tal cual al modelo.
fn parse_threshold(text: &str) -> Result<f32, DomainError> {
    match text.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DomainError::InvalidInput(format!(
            "confidence_threshold must be a number, got '{}'",
            text.trim()
        ))),
    }
}
