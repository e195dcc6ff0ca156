use ndarray::{s, ArrayView2};
use std::cmp::Ordering;

use crate::domain::detection::RawDetection;

/// Decodifica la salida YOLOv8/11 `[4 + C, N]` (cx, cy, w, h, scores...).
/// Solo pasan candidatos con `score >= conf_threshold`; las cajas se escalan a la imagen original.
pub fn decode_candidates(view: ArrayView2<f32>, conf_threshold: f32, sx: f32, sy: f32) -> Vec<RawDetection> {
    let num_candidates = view.shape()[1];
    let mut out = Vec::new();

    for i in 0..num_candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score >= conf_threshold {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            out.push(RawDetection {
                bbox: [
                    (cx - w / 2.0) * sx,
                    (cy - h / 2.0) * sy,
                    (cx + w / 2.0) * sx,
                    (cy + h / 2.0) * sy,
                ],
                class_id,
                score: max_score,
            });
        }
    }
    out
}

/// IoU de dos cajas en formato esquina (x1, y1, x2, y2).
pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_x1 = a[0].max(b[0]);
    let inter_y1 = a[1].max(b[1]);
    let inter_x2 = a[2].min(b[2]);
    let inter_y2 = a[3].min(b[3]);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union_area = area_a + area_b - inter_area;
    if union_area <= 0.0 { 0.0 } else { inter_area / union_area }
}

/// NMS por clase. El resultado queda ordenado por score descendente.
pub fn non_maximum_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && compute_iou(&k.bbox, &det.bbox) > iou_threshold);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}
