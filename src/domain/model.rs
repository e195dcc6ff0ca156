use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolov8n"
    pub onnx_path: String,  // filesystem path
}

impl ModelId {
    pub fn from_path(onnx_path: &str) -> Self {
        let name = std::path::Path::new(onnx_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        Self { name, onnx_path: onnx_path.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Vocabulario de clases del modelo, fijo desde la carga.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary(Vec<String>);

impl LabelVocabulary {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn coco() -> Self {
        Self(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Interpreta el metadato `names` de los exports de Ultralytics:
    /// `{0: 'person', 1: 'bicycle', ...}`. Devuelve `None` si no hay entradas válidas.
    pub fn from_names_metadata(raw: &str) -> Option<Self> {
        let body = raw.trim().trim_start_matches('{').trim_end_matches('}');
        let mut entries: Vec<(usize, String)> = Vec::new();

        for item in split_entries(body) {
            let Some((key, value)) = item.split_once(':') else { continue };
            let Ok(id) = key.trim().parse::<usize>() else { continue };
            let name = value.trim().trim_matches(|c| c == '\'' || c == '"');
            if !name.is_empty() {
                entries.push((id, name.to_string()));
            }
        }

        if entries.is_empty() {
            return None;
        }
        entries.sort_by_key(|(id, _)| *id);
        // Los ids deben ser contiguos desde 0 para que el índice sea el id de clase.
        if entries.iter().enumerate().any(|(i, (id, _))| i != *id) {
            return None;
        }
        Some(Self(entries.into_iter().map(|(_, name)| name).collect()))
    }

    pub fn resolve(&self, class_id: usize) -> Option<&str> {
        self.0.get(class_id).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Separa por comas que no estén dentro de comillas ("hair drier", 'potted plant', ...).
fn split_entries(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ',') => {
                out.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&body[start..]);
    out
}

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana",
    "apple", "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza",
    "donut", "cake", "chair", "couch", "potted plant", "bed", "dining table", "toilet", "tv",
    "laptop", "mouse", "remote", "keyboard", "cell phone", "microwave", "oven", "toaster",
    "sink", "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];
