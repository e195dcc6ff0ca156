pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

/// Inicializa los logs (RUST_LOG=info por defecto).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
