pub mod client;
pub mod routes;
pub mod state;
pub mod view;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::adapters::ui::state::UiState;

pub fn router(state: UiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index).post(routes::submit))
        .route("/health", get(routes::health))
        // La imagen retenida va en base64 (~4/3 del tamaño original) además del fichero.
        .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_mul(3)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
