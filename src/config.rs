use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::http::DEFAULT_MAX_UPLOAD_BYTES;
use crate::application::services::DetectSettings;
use crate::domain::model::YoloParams;

/// Servicio de detección: cada opción se puede dar como flag o variable de entorno.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "YOLO object detection HTTP API", long_about = None)]
pub struct ApiConfig {
    /// Modelo ONNX exportado (YOLOv8/11)
    #[arg(long, env = "MODEL_PATH", default_value = "models/yolov8n.onnx")]
    pub model_path: String,

    /// Umbral de confianza cuando la petición no lo indica
    #[arg(long, env = "CONFIDENCE_THRESHOLD_DEFAULT", default_value_t = 0.25)]
    pub confidence_threshold_default: f32,

    /// Carpeta donde se sobrescribe last_annotated.jpg (se crea si no existe)
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Lado de la entrada cuadrada del modelo
    #[arg(long, env = "MODEL_INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.45)]
    pub iou_threshold: f32,

    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Plazo máximo de una inferencia en segundos (sin límite si no se indica)
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS")]
    pub inference_timeout_secs: Option<u64>,

    /// Fuente TTF/OTF que sustituye a la DejaVu Sans embebida en las etiquetas
    #[arg(long, env = "ANNOTATION_FONT")]
    pub annotation_font: Option<PathBuf>,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ApiConfig {
    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }

    pub fn detect_settings(&self) -> DetectSettings {
        DetectSettings {
            default_threshold: self.confidence_threshold_default,
            inference_timeout: self.inference_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Cliente interactivo (página web que reenvía a la API).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Browser front end for the detection API", long_about = None)]
pub struct UiConfig {
    /// Endpoint completo de detección
    #[arg(long, env = "API_URL", default_value = "http://127.0.0.1:8000/detect")]
    pub api_url: String,

    #[arg(long, env = "UI_BIND_ADDR", default_value = "0.0.0.0:8501")]
    pub bind: String,

    #[arg(long, env = "API_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}
