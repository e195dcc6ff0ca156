use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Culpa del cliente; el mensaje se devuelve tal cual en `detail`.
    #[error("{0}")]
    InvalidInput(String),
    /// Culpa del servidor; el detalle solo va a los logs.
    #[error("Fallo de inferencia: {0}")]
    InferenceFailed(String),
    #[error("Error de operación: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
