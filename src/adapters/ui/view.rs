use base64::{prelude::BASE64_STANDARD, Engine};

use crate::adapters::ui::client::{ChosenImage, SubmitOutcome};

pub const DEFAULT_THRESHOLD: f32 = 0.25;
pub const THRESHOLD_STEP: f32 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
    Info(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Heading(String),
    Item(String),
}

/// Panel de resultados derivado de un envío.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub notice: Notice,
    pub lines: Vec<Line>,
}

impl ResultsView {
    pub fn from_outcome(outcome: &SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Detected(result) => {
                let mut lines = Vec::new();
                if result.detections.is_empty() {
                    lines.push(Line::Item("No objects detected.".into()));
                } else {
                    lines.push(Line::Heading(format!("Total objects detected: {}", result.total())));
                    lines.push(Line::Heading("Summary by class:".into()));
                    for (label, count) in &result.summary {
                        lines.push(Line::Item(format!("- {}: {}", label, count)));
                    }
                    lines.push(Line::Heading("Detections:".into()));
                    for (i, d) in result.detections.iter().enumerate() {
                        lines.push(Line::Item(format!(
                            "{}. {} (score: {:.2}) at box {:?}",
                            i + 1,
                            d.label,
                            d.score,
                            d.bbox
                        )));
                    }
                }
                Self { notice: Notice::Success("Detection complete!".into()), lines }
            }
            SubmitOutcome::Rejected { status, body } => Self {
                notice: Notice::Error(format!("Error: {} - {}", status, body)),
                lines: Vec::new(),
            },
            SubmitOutcome::Failed(msg) => Self {
                notice: Notice::Error(format!("Request failed: {}", msg)),
                lines: Vec::new(),
            },
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self { notice, lines: Vec::new() }
    }

    /// Antepone un aviso a las líneas del panel.
    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        if let Some(w) = warning {
            self.lines.insert(0, Line::Item(format!("Warning: {}", w)));
        }
        self
    }
}

/// Todo lo que necesita la página para pintarse.
#[derive(Debug, Clone)]
pub struct PageModel {
    pub threshold: f32,
    pub chosen: Option<ChosenImage>,
    pub results: Option<ResultsView>,
}

impl Default for PageModel {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            chosen: None,
            results: None,
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_results(results: &ResultsView) -> String {
    let notice = match &results.notice {
        Notice::Success(msg) => format!(r#"<div class="notice success">{}</div>"#, escape_html(msg)),
        Notice::Error(msg) => format!(r#"<div class="notice error">{}</div>"#, escape_html(msg)),
        Notice::Info(msg) => format!(r#"<div class="notice info">{}</div>"#, escape_html(msg)),
    };
    let lines: String = results
        .lines
        .iter()
        .map(|line| match line {
            Line::Heading(text) => format!("<p><strong>{}</strong></p>\n", escape_html(text)),
            Line::Item(text) => format!("<p>{}</p>\n", escape_html(text)),
        })
        .collect();
    format!("<h2>Detection Results</h2>\n{}\n{}", notice, lines)
}

// La imagen elegida viaja de vuelta en campos ocultos para poder re-enviarla
// con otro umbral sin volver a seleccionarla.
fn render_chosen(chosen: Option<&ChosenImage>) -> (String, String) {
    match chosen {
        Some(img) => {
            let data = BASE64_STANDARD.encode(&img.bytes);
            let preview = format!(
                r#"<img id="preview" alt="Uploaded Image" src="data:{};base64,{}"><p class="caption">{}</p>"#,
                escape_html(&img.content_type),
                data,
                escape_html(&img.file_name)
            );
            let hidden = format!(
                r#"<input type="hidden" name="retained_name" value="{}">
<input type="hidden" name="retained_type" value="{}">
<input type="hidden" name="retained_data" value="{}">"#,
                escape_html(&img.file_name),
                escape_html(&img.content_type),
                data
            );
            (preview, hidden)
        }
        None => (r#"<img id="preview" alt="" hidden>"#.to_string(), String::new()),
    }
}

pub fn render_page(model: &PageModel) -> String {
    let (preview, hidden) = render_chosen(model.chosen.as_ref());
    let results = model.results.as_ref().map(render_results).unwrap_or_default();
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>YOLO Object Detection</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.columns {{ display: flex; gap: 2rem; }}
.columns > div {{ flex: 1; }}
#preview {{ max-width: 100%; }}
.notice {{ padding: .5rem 1rem; border-radius: 4px; margin-bottom: 1rem; }}
.success {{ background: #e6f4ea; }}
.error {{ background: #fce8e6; }}
.info {{ background: #e8f0fe; }}
</style>
</head>
<body>
<h1>YOLO Object Detection</h1>
<form method="post" action="/" enctype="multipart/form-data" onsubmit="busy()">
<aside>
<h3>Settings</h3>
<label>Confidence Threshold
<input type="range" name="confidence_threshold" min="0" max="1" step="{step}" value="{threshold}"
 oninput="document.getElementById('threshold_value').textContent = Number(this.value).toFixed(2)">
<output id="threshold_value">{threshold:.2}</output>
</label>
</aside>
<p><label>Choose an image...
<input type="file" name="image" accept=".jpg,.jpeg,.png,image/jpeg,image/png" onchange="showPreview(this)">
</label></p>
{hidden}
<div class="columns">
<div>{preview}</div>
<div id="results">{results}</div>
</div>
<button id="detect" type="submit">Detect Objects</button>
<span id="spinner" hidden>Detecting...</span>
</form>
<script>
function showPreview(input) {{
  const file = input.files[0];
  if (!file) return;
  const img = document.getElementById('preview');
  const reader = new FileReader();
  reader.onload = e => {{ img.src = e.target.result; img.hidden = false; }};
  reader.readAsDataURL(file);
}}
function busy() {{
  document.getElementById('detect').disabled = true;
  document.getElementById('spinner').hidden = false;
}}
</script>
</body>
</html>
"#,
        step = THRESHOLD_STEP,
        threshold = model.threshold,
        hidden = hidden,
        preview = preview,
        results = results,
    )
}
