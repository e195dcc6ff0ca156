use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::ArtifactPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};

pub const ARTIFACT_FILE_NAME: &str = "last_annotated.jpg";

const BOX_THICKNESS: i32 = 2;
const LABEL_FONT_SIZE: f32 = 18.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// Fuente por defecto; ANNOTATION_FONT solo la sustituye.
static DEFAULT_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans.ttf");

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56], [255, 157, 151], [255, 112, 31], [255, 178, 29], [207, 210, 49],
    [72, 249, 10], [26, 147, 52], [0, 212, 187], [44, 153, 168], [0, 194, 255],
];

/// Escribe la copia anotada de la última petición en `<output_dir>/last_annotated.jpg`.
///
/// Peticiones concurrentes pisan el mismo fichero sin exclusión mutua; el
/// resultado final puede corresponder a cualquiera de ellas.
pub struct AnnotatedImageWriter {
    output_path: PathBuf,
    font: FontArc,
}

impl AnnotatedImageWriter {
    pub fn new(output_dir: &Path, font_path: Option<&Path>) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("no se pudo crear {}", output_dir.display()))?;

        let font = match font_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("no se pudo leer la fuente {}", path.display()))?;
                FontArc::try_from_vec(bytes)
                    .with_context(|| format!("fuente TTF/OTF inválida: {}", path.display()))?
            }
            None => FontArc::try_from_slice(DEFAULT_FONT).context("fuente embebida inválida")?,
        };

        Ok(Self {
            output_path: output_dir.join(ARTIFACT_FILE_NAME),
            font,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Dibuja cajas y etiquetas sobre una copia de la imagen.
    pub fn render(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.clone();
        for det in detections {
            self.draw_detection(&mut canvas, det);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, det: &Detection) {
        let Some(rect) = clamp_box(&det.bbox, canvas.width(), canvas.height()) else {
            return;
        };
        let color = Rgb(color_for(&det.label));

        for t in 0..BOX_THICKNESS {
            let w = rect.width() as i32 - 2 * t;
            let h = rect.height() as i32 - 2 * t;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                canvas,
                Rect::at(rect.left() + t, rect.top() + t).of_size(w as u32, h as u32),
                color,
            );
        }

        let text = format!("{} {:.2}", det.label, det.score);
        let scale = PxScale::from(LABEL_FONT_SIZE);
        let (tw, th) = text_size(scale, &self.font, &text);
        let bar_h = th + 4;
        let top = (rect.top() - bar_h as i32).max(0);
        draw_filled_rect_mut(canvas, Rect::at(rect.left(), top).of_size(tw + 4, bar_h), color);
        draw_text_mut(canvas, TEXT_COLOR, rect.left() + 2, top + 2, scale, &self.font, &text);
    }
}

impl ArtifactPort for AnnotatedImageWriter {
    // Se escribe en un temporal y se renombra: el último rename gana y nunca queda un JPEG a medias.
    fn write(&self, image: &RgbImage, detections: &[Detection]) -> DomainResult<PathBuf> {
        let annotated = self.render(image, detections);
        let tmp = self.output_path.with_file_name(format!(
            ".{}.{}-{}.tmp",
            ARTIFACT_FILE_NAME,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = annotated
            .save_with_format(&tmp, ImageFormat::Jpeg)
            .map_err(|e| e.to_string())
            .and_then(|_| std::fs::rename(&tmp, &self.output_path).map_err(|e| e.to_string()));

        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(DomainError::OperationFailed(format!(
                "{}: {}",
                self.output_path.display(),
                e
            )));
        }
        Ok(self.output_path.clone())
    }
}

/// Recorta la caja a la imagen. `None` si queda vacía.
fn clamp_box(bbox: &[f32; 4], width: u32, height: u32) -> Option<Rect> {
    if width == 0 || height == 0 || bbox.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x1 = bbox[0].floor().clamp(0.0, max_x) as i32;
    let y1 = bbox[1].floor().clamp(0.0, max_y) as i32;
    let x2 = bbox[2].ceil().clamp(0.0, max_x) as i32;
    let y2 = bbox[3].ceil().clamp(0.0, max_y) as i32;

    if x1 >= x2 || y1 >= y2 {
        return None;
    }
    Some(Rect::at(x1, y1).of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32))
}

fn color_for(label: &str) -> [u8; 3] {
    let hash = label.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}
