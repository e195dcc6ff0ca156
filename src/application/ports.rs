use async_trait::async_trait;
use image::RgbImage;
use std::path::PathBuf;

use crate::domain::{
    detection::{Detection, RawDetection},
    errors::DomainResult,
    model::{LabelVocabulary, ModelId},
};

/// Capacidad de detección: cualquier backend (ONNX, stub de tests) sirve.
/// Las llamadas son bloqueantes; el servicio las ejecuta en `spawn_blocking`.
pub trait DetectorPort: Send + Sync {
    fn labels(&self) -> &LabelVocabulary;
    /// Devuelve solo detecciones con `score >= threshold`.
    fn detect(&self, image: &RgbImage, threshold: f32) -> DomainResult<Vec<RawDetection>>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}

/// Destino de la imagen anotada (bloqueante).
pub trait ArtifactPort: Send + Sync {
    fn write(&self, image: &RgbImage, detections: &[Detection]) -> DomainResult<PathBuf>;
}
