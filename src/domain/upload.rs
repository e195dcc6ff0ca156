use image::RgbImage;

use super::errors::{DomainError, DomainResult};

pub const NOT_AN_IMAGE: &str = "File provided is not an image";

/// Archivo recibido en el campo `image` del formulario.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Solo se acepta lo que el cliente anuncia como `image/*`; no se mira el contenido.
pub fn ensure_image_content_type(content_type: Option<&str>) -> DomainResult<()> {
    match content_type {
        Some(ct) if ct.trim().to_ascii_lowercase().starts_with("image/") => Ok(()),
        _ => Err(DomainError::InvalidInput(NOT_AN_IMAGE.into())),
    }
}

/// Decodifica a RGB8. El error del decodificador viaja al cliente.
pub fn decode_rgb(bytes: &[u8]) -> DomainResult<RgbImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| DomainError::InvalidInput(format!("Invalid image file: {}", e)))
}
