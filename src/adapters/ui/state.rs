use crate::adapters::ui::client::DetectApiClient;

/// Estado compartido de la interfaz: solo el cliente de la API.
#[derive(Clone)]
pub struct UiState {
    pub api: DetectApiClient,
}
