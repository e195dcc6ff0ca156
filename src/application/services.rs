use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tracing::{debug, error, info};

use crate::{
    application::ports::{ArtifactPort, DetectorPort},
    domain::{
        detection::{summarize_detections, Detection, DetectionResult, RawDetection},
        errors::{DomainError, DomainResult},
        model::LabelVocabulary,
        upload::{decode_rgb, ensure_image_content_type, ImageUpload},
    },
};

#[derive(Debug, Clone)]
pub struct DetectSettings {
    /// Umbral cuando el formulario no trae `confidence_threshold`.
    pub default_threshold: f32,
    /// Plazo máximo de la inferencia. `None` = sin límite.
    pub inference_timeout: Option<Duration>,
}

impl Default for DetectSettings {
    fn default() -> Self {
        Self {
            default_threshold: 0.25,
            inference_timeout: None,
        }
    }
}

/// Caso de uso de detección: validar, decodificar, inferir, ensamblar y anotar.
/// El modelo se inyecta una vez al arrancar y solo se lee después.
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn DetectorPort>,
    artifacts: Arc<dyn ArtifactPort>,
    settings: DetectSettings,
}

impl DetectionService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        artifacts: Arc<dyn ArtifactPort>,
        settings: DetectSettings,
    ) -> Self {
        Self {
            detector,
            artifacts,
            settings,
        }
    }

    pub fn default_threshold(&self) -> f32 {
        self.settings.default_threshold
    }

    pub fn labels(&self) -> &LabelVocabulary {
        self.detector.labels()
    }

    /// Ejecuta una petición completa. El umbral se pasa al modelo sin validar rango.
    pub async fn detect(
        &self,
        upload: ImageUpload,
        threshold: Option<f32>,
    ) -> DomainResult<DetectionResult> {
        ensure_image_content_type(upload.content_type.as_deref())?;
        let threshold = threshold.unwrap_or(self.settings.default_threshold);

        let image = tokio::task::spawn_blocking(move || decode_rgb(&upload.bytes))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("decode task aborted: {}", e)))??;
        debug!("Imagen decodificada: {}x{}", image.width(), image.height());
        let image = Arc::new(image);

        let raw = self.run_inference(image.clone(), threshold).await.map_err(|e| {
            error!("❌ Inference error: {}", e);
            e
        })?;

        let result = DetectionResult::assemble(&raw, self.detector.labels()).map_err(|e| {
            error!("❌ Inference error: {}", e);
            e
        })?;
        info!(
            "✅ {} detecciones (umbral {}): [{}]",
            result.total(),
            threshold,
            summarize_detections(&result)
        );

        self.persist_artifact(image, result.detections.clone()).await;
        Ok(result)
    }

    async fn run_inference(
        &self,
        image: Arc<RgbImage>,
        threshold: f32,
    ) -> DomainResult<Vec<RawDetection>> {
        let detector = self.detector.clone();
        let task = tokio::task::spawn_blocking(move || detector.detect(&image, threshold));

        // Si vence el plazo, la tarea bloqueante sigue hasta terminar; solo se deja de esperar.
        let joined = match self.settings.inference_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                DomainError::InferenceFailed(format!("deadline of {:?} exceeded", limit))
            })?,
            None => task.await,
        };

        match joined {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(DomainError::InferenceFailed(msg))) => Err(DomainError::InferenceFailed(msg)),
            Ok(Err(other)) => Err(DomainError::InferenceFailed(other.to_string())),
            Err(e) => Err(DomainError::InferenceFailed(format!("inference task aborted: {}", e))),
        }
    }

    /// Paso "best effort": cualquier error o panic del anotador se registra y se descarta.
    async fn persist_artifact(&self, image: Arc<RgbImage>, detections: Vec<Detection>) {
        let artifacts = self.artifacts.clone();
        let outcome =
            tokio::task::spawn_blocking(move || artifacts.write(&image, &detections)).await;

        match outcome {
            Ok(Ok(path)) => info!("🖼️ Imagen anotada guardada en {}", path.display()),
            Ok(Err(e)) => error!("❌ Failed to save annotated image: {}", e),
            Err(e) => error!("❌ Failed to save annotated image (task aborted): {}", e),
        }
    }
}
