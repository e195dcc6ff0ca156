use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use yolo_onnx_detect::adapters::{
    artifact::annotator::AnnotatedImageWriter,
    http::{router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
};
use yolo_onnx_detect::application::{ports::ModelCatalogPort, services::DetectionService};
use yolo_onnx_detect::config::ApiConfig;
use yolo_onnx_detect::domain::model::ModelId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs y configuración
    yolo_onnx_detect::init_tracing();
    let cfg = ApiConfig::parse();

    // 2. Cargar el modelo una sola vez. Si falla, el servidor no arranca.
    let model_id = ModelId::from_path(&cfg.model_path);
    info!("🔧 Loading model {} from {}", model_id.name, model_id.onnx_path);
    let engine = match load_model(&cfg, &model_id).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("❌ Failed to load model: {:#}", e);
            return Err(e);
        }
    };
    info!("Model loaded successfully");

    // 3. Destino de la imagen anotada (crea OUTPUT_DIR si no existe)
    let artifacts = AnnotatedImageWriter::new(&cfg.output_dir, cfg.annotation_font.as_deref())
        .map_err(|e| {
            error!("❌ Output setup failed: {:#}", e);
            e
        })?;
    info!("📂 Annotated image path: {}", artifacts.output_path().display());

    // 4. Caso de uso + estado HTTP
    let detection = DetectionService::new(Arc::new(engine), Arc::new(artifacts), cfg.detect_settings());
    info!(
        "Vocabulario: {} clases, umbral por defecto {}",
        detection.labels().len(),
        detection.default_threshold()
    );
    let state = HttpState {
        detection: Arc::new(detection),
    };
    let app = router(state, cfg.max_upload_bytes);

    // 5. Lanzar el servidor
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", cfg.bind))?;
    info!("🚀 Detection API listening on http://{}", cfg.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn load_model(cfg: &ApiConfig, model_id: &ModelId) -> anyhow::Result<OnnxYoloEngine> {
    OnnxModelCatalog::new().validate_model(model_id).await?;

    let path = model_id.onnx_path.clone();
    let params = cfg.yolo_params();
    let threads = cfg.intra_threads;
    tokio::task::spawn_blocking(move || OnnxYoloEngine::load(&path, params, threads)).await?
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("🛑 Shutting down");
    }
}
