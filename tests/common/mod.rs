#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use image::{Rgb, RgbImage};

use yolo_onnx_detect::adapters::artifact::annotator::AnnotatedImageWriter;
use yolo_onnx_detect::adapters::http::{router, state::HttpState, DEFAULT_MAX_UPLOAD_BYTES};
use yolo_onnx_detect::application::ports::DetectorPort;
use yolo_onnx_detect::application::services::{DetectSettings, DetectionService};
use yolo_onnx_detect::domain::detection::RawDetection;
use yolo_onnx_detect::domain::errors::{DomainError, DomainResult};
use yolo_onnx_detect::domain::model::LabelVocabulary;

pub const BOUNDARY: &str = "----detect-test-boundary";

pub fn vocab() -> LabelVocabulary {
    LabelVocabulary::new(vec!["person".into(), "car".into(), "dog".into()])
}

/// Stub determinista: devuelve candidatos fijos filtrados por umbral.
pub struct StubDetector {
    pub labels: LabelVocabulary,
    pub candidates: Vec<RawDetection>,
    pub calls: AtomicUsize,
}

impl StubDetector {
    pub fn new(candidates: Vec<RawDetection>) -> Self {
        Self { labels: vocab(), candidates, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DetectorPort for StubDetector {
    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    fn detect(&self, _image: &RgbImage, threshold: f32) -> DomainResult<Vec<RawDetection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.iter().filter(|d| d.score >= threshold).cloned().collect())
    }
}

/// Una detección que depende de la imagen: rojo -> person, otro color -> car; caja = imagen entera.
pub struct ColorDetector {
    pub labels: LabelVocabulary,
}

impl DetectorPort for ColorDetector {
    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    fn detect(&self, image: &RgbImage, _threshold: f32) -> DomainResult<Vec<RawDetection>> {
        std::thread::sleep(Duration::from_millis(50));
        let class_id = if image.get_pixel(0, 0).0 == [255, 0, 0] { 0 } else { 1 };
        Ok(vec![RawDetection {
            bbox: [0.0, 0.0, image.width() as f32, image.height() as f32],
            class_id,
            score: 0.9,
        }])
    }
}

pub struct FailingDetector {
    pub labels: LabelVocabulary,
}

impl DetectorPort for FailingDetector {
    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    fn detect(&self, _image: &RgbImage, _threshold: f32) -> DomainResult<Vec<RawDetection>> {
        Err(DomainError::InferenceFailed("CUDA error: out of memory at 0xdeadbeef".into()))
    }
}

pub struct SlowDetector {
    pub labels: LabelVocabulary,
    pub delay: Duration,
}

impl DetectorPort for SlowDetector {
    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    fn detect(&self, _image: &RgbImage, _threshold: f32) -> DomainResult<Vec<RawDetection>> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }
}

pub fn sample_candidates() -> Vec<RawDetection> {
    vec![
        RawDetection { bbox: [10.0, 20.0, 110.0, 220.0], class_id: 0, score: 0.92 },
        RawDetection { bbox: [200.0, 40.0, 320.0, 140.0], class_id: 1, score: 0.55 },
        RawDetection { bbox: [15.0, 25.0, 100.0, 210.0], class_id: 0, score: 0.41 },
        RawDetection { bbox: [400.0, 300.0, 500.0, 420.0], class_id: 2, score: 0.12 },
    ]
}

pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
    buf
}

pub fn build_app(detector: Arc<dyn DetectorPort>, output_dir: &Path, settings: DetectSettings) -> Router {
    let artifacts = AnnotatedImageWriter::new(output_dir, None).unwrap();
    let service = DetectionService::new(detector, Arc::new(artifacts), settings);
    router(HttpState { detection: Arc::new(service) }, DEFAULT_MAX_UPLOAD_BYTES)
}

pub enum FormPart<'a> {
    File { name: &'a str, file_name: &'a str, content_type: &'a str, bytes: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::File { name, file_name, content_type, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value).as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn image_request(bytes: &[u8], content_type: &str, threshold: Option<&str>) -> Request<Body> {
    let mut parts = vec![FormPart::File {
        name: "image",
        file_name: "upload.png",
        content_type,
        bytes,
    }];
    if let Some(value) = threshold {
        parts.push(FormPart::Text { name: "confidence_threshold", value });
    }
    multipart_request("/detect", &parts)
}

pub async fn body_json(res: axum::response::Response) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(res: axum::response::Response) -> String {
    use http_body_util::BodyExt;
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
