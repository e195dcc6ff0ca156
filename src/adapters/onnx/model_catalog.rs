use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

/// Comprueba el fichero del modelo antes de intentar abrir la sesión ONNX.
pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

impl Default for OnnxModelCatalog {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        let path = Path::new(&model.onnx_path);
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| DomainError::NotFound(format!("model file not found: {}", model.onnx_path)))?;
        if !meta.is_file() {
            return Err(DomainError::InvalidInput(format!("model path is not a file: {}", model.onnx_path)));
        }
        let is_onnx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false);
        if !is_onnx {
            return Err(DomainError::InvalidInput(format!("expected an .onnx model: {}", model.onnx_path)));
        }
        Ok(())
    }
}
