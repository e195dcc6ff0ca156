use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::adapters::onnx::postprocess::{decode_candidates, non_maximum_suppression};
use crate::application::ports::DetectorPort;
use crate::domain::detection::RawDetection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{LabelVocabulary, YoloParams};

/// Motor YOLO sobre ONNX Runtime. Se carga una vez y se comparte entre peticiones.
pub struct OnnxYoloEngine {
    // `Session::run` necesita `&mut`; las inferencias se serializan.
    session: Mutex<Session>,
    labels: LabelVocabulary,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, params: YoloParams, intra_threads: usize) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(intra_threads)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path).with_context(|| format!("no se pudo leer el modelo {}", path))?;
        let session = builder.commit_from_memory(&model_bytes)?;
        let labels = read_labels(&session);

        info!(
            "Modelo {} cargado: {} clases, entrada {}x{}",
            path,
            labels.len(),
            params.input_size,
            params.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            params,
        })
    }

    pub fn infer(&self, rgb: &RgbImage, conf_threshold: f32) -> Result<Vec<RawDetection>> {
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (input_data, _) = input.into_raw_vec_and_offset();
        let input_tensor = Tensor::from_array((input_shape, input_data))?;

        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut session = lock_recovering(&self.session);
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] < 5 {
            return Err(anyhow!("salida del modelo inesperada: {:?}", dims));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let candidates = decode_candidates(view, conf_threshold, sx, sy);
        let mut detections = non_maximum_suppression(candidates, self.params.iou_threshold);
        detections.truncate(self.params.max_detections);
        Ok(detections)
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    fn detect(&self, image: &RgbImage, threshold: f32) -> DomainResult<Vec<RawDetection>> {
        self.infer(image, threshold)
            .map_err(|e| DomainError::InferenceFailed(format!("{:#}", e)))
    }
}

// Los exports de Ultralytics guardan las clases en el metadato `names`.
fn read_labels(session: &Session) -> LabelVocabulary {
    let names = session
        .metadata()
        .ok()
        .and_then(|meta| meta.custom("names").ok().flatten());

    match names.as_deref().and_then(LabelVocabulary::from_names_metadata) {
        Some(labels) => labels,
        None => {
            warn!("⚠️ El modelo no trae metadato 'names'; se usan las 80 clases COCO");
            LabelVocabulary::coco()
        }
    }
}

/// Toma el mutex aunque un panic anterior lo haya envenenado.
/// La sesión no guarda estado entre `run`s, así que sigue siendo utilizable.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("⚠️ Mutex de la sesión ONNX envenenado por un panic previo; se recupera");
        mutex.clear_poison();
        poisoned.into_inner()
    })
}
