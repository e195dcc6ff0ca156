use axum::{
    extract::{Multipart, State},
    response::Html,
    Json,
};
use base64::{prelude::BASE64_STANDARD, Engine};
use tracing::warn;

use crate::adapters::ui::{
    client::ChosenImage,
    state::UiState,
    view::{render_page, Notice, PageModel, ResultsView, DEFAULT_THRESHOLD},
};
use crate::application::dto::HealthResponse;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn index() -> Html<String> {
    Html(render_page(&PageModel::default()))
}

/// Campos del formulario de la página.
#[derive(Debug, Default)]
struct SubmitForm {
    image: Option<ChosenImage>,
    threshold: Option<String>,
    retained_name: Option<String>,
    retained_type: Option<String>,
    retained_data: Option<String>,
}

impl SubmitForm {
    // Un fichero nuevo tiene prioridad sobre el que ya se mostraba.
    fn chosen_image(self) -> Option<ChosenImage> {
        if let Some(image) = self.image {
            return Some(image);
        }
        let bytes = BASE64_STANDARD.decode(self.retained_data?.trim()).ok()?;
        if bytes.is_empty() {
            return None;
        }
        Some(ChosenImage {
            file_name: self.retained_name.unwrap_or_else(|| "image".into()),
            content_type: self.retained_type.unwrap_or_else(|| "application/octet-stream".into()),
            bytes,
        })
    }
}

async fn read_form(mut multipart: Multipart) -> Result<SubmitForm, String> {
    let mut form = SubmitForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| e.body_text())?;
                // Un input de fichero vacío llega como parte sin nombre ni contenido.
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.image = Some(ChosenImage { file_name, content_type, bytes: bytes.to_vec() });
                }
            }
            "confidence_threshold" => {
                form.threshold = Some(field.text().await.map_err(|e| e.body_text())?);
            }
            "retained_name" => form.retained_name = Some(field.text().await.map_err(|e| e.body_text())?),
            "retained_type" => form.retained_type = Some(field.text().await.map_err(|e| e.body_text())?),
            "retained_data" => form.retained_data = Some(field.text().await.map_err(|e| e.body_text())?),
            _ => {}
        }
    }
    Ok(form)
}

pub async fn submit(State(st): State<UiState>, multipart: Multipart) -> Html<String> {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("⚠️ Formulario inválido: {}", e);
            let model = PageModel {
                results: Some(ResultsView::notice(Notice::Error(format!("Invalid form: {}", e)))),
                ..PageModel::default()
            };
            return Html(render_page(&model));
        }
    };

    let (threshold, threshold_warning) = parse_threshold(form.threshold.as_deref());
    if let Some(w) = &threshold_warning {
        warn!("⚠️ {}", w);
    }

    let Some(chosen) = form.chosen_image() else {
        let results = ResultsView::notice(Notice::Info("Please choose an image first.".into()));
        let model = PageModel {
            threshold,
            chosen: None,
            results: Some(results.with_warning(threshold_warning)),
        };
        return Html(render_page(&model));
    };

    let outcome = st.api.submit(&chosen, threshold).await;
    let model = PageModel {
        threshold,
        results: Some(ResultsView::from_outcome(&outcome).with_warning(threshold_warning)),
        chosen: Some(chosen),
    };
    Html(render_page(&model))
}

/// Umbral del formulario. Un campo ausente o vacío usa el valor por defecto sin aviso;
/// un texto no numérico o no finito también, pero devuelve el aviso a mostrar.
fn parse_threshold(text: Option<&str>) -> (f32, Option<String>) {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return (DEFAULT_THRESHOLD, None);
    };
    match text.parse::<f32>() {
        Ok(value) if value.is_finite() => (value, None),
        _ => (
            DEFAULT_THRESHOLD,
            Some(format!(
                "Invalid confidence threshold '{}'; using {}",
                text, DEFAULT_THRESHOLD
            )),
        ),
    }
}
