use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use yolo_onnx_detect::adapters::ui::{client::DetectApiClient, router, state::UiState};
use yolo_onnx_detect::config::UiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    yolo_onnx_detect::init_tracing();
    let cfg = UiConfig::parse();

    let api = DetectApiClient::new(&cfg.api_url, Duration::from_secs(cfg.request_timeout_secs));
    info!("🔗 Forwarding detections to {}", api.api_url());

    let app = router(UiState { api }, cfg.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", cfg.bind))?;
    info!("🚀 UI available at http://{}", cfg.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
