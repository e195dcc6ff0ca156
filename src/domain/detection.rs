use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};
use super::model::LabelVocabulary;

/// Salida cruda del modelo: caja en píxeles de la imagen original + id de clase.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x1, y1, x2, y2
    pub class_id: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub label: String,
    pub score: f32,
}

/// Cuerpo completo de la respuesta de `/detect`.
///
/// `summary` conserva el orden de primera aparición de cada etiqueta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    pub summary: IndexMap<String, usize>,
}

impl DetectionResult {
    /// Construye detecciones y resumen en una sola pasada, respetando el orden del modelo.
    /// Un id de clase fuera del vocabulario es un fallo de inferencia.
    pub fn assemble(raw: &[RawDetection], labels: &LabelVocabulary) -> DomainResult<Self> {
        let mut result = Self::default();
        for det in raw {
            let label = labels.resolve(det.class_id).ok_or_else(|| {
                DomainError::InferenceFailed(format!(
                    "class id {} outside label vocabulary ({} labels)",
                    det.class_id,
                    labels.len()
                ))
            })?;
            *result.summary.entry(label.to_string()).or_insert(0) += 1;
            result.detections.push(Detection {
                bbox: det.bbox,
                label: label.to_string(),
                score: det.score,
            });
        }
        Ok(result)
    }

    pub fn total(&self) -> usize {
        self.detections.len()
    }
}

/// Resumen legible para logs, p.ej. "2 person, 1 dog".
pub fn summarize_detections(result: &DetectionResult) -> String {
    result
        .summary
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
