use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::detection::DetectionResult;

/// Imagen elegida por el usuario en el navegador.
#[derive(Debug, Clone)]
pub struct ChosenImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Resultado de un envío a la API, tal y como lo ve la interfaz.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// 200 con un cuerpo `DetectionResult` válido.
    Detected(DetectionResult),
    /// Cualquier estado distinto de 200, con el cuerpo sin interpretar.
    Rejected { status: u16, body: String },
    /// Fallo de transporte (conexión, timeout, cuerpo ilegible).
    Failed(String),
}

/// Cliente HTTP de `/detect`. Un envío = una petición; sin reintentos ni caché.
#[derive(Clone)]
pub struct DetectApiClient {
    client: reqwest::Client,
    api_url: String,
}

impl DetectApiClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn submit(&self, image: &ChosenImage, threshold: f32) -> SubmitOutcome {
        match self.try_submit(image, threshold).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("⚠️ Petición a {} fallida: {}", self.api_url, e);
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_submit(&self, image: &ChosenImage, threshold: f32) -> Result<SubmitOutcome, reqwest::Error> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new()
            .part("image", part)
            .text("confidence_threshold", threshold.to_string());

        let res = self.client.post(&self.api_url).multipart(form).send().await?;
        let status = res.status();

        if status == StatusCode::OK {
            let result = res.json::<DetectionResult>().await?;
            info!("🔍 {} -> {} detecciones", image.file_name, result.total());
            Ok(SubmitOutcome::Detected(result))
        } else {
            let body = res.text().await?;
            Ok(SubmitOutcome::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
