//! Errores del relay y su clasificación.
//!
//! El poller trata cualquier fallo de entrega como reintentable (el ciclo
//! completo se aborta y se reintenta tras un backoff fijo); la clasificación
//! alimenta los logs y deja constancia de qué fallos son de transporte y
//! cuáles no se van a resolver reintentando el mismo registro.

use fraud_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// El servicio de scoring respondió con un status distinto de 200.
    #[error("scoring service respondió {status}: {body}")]
    ServiceRejected { status: u16, body: String },
    /// Fallo de red antes de obtener una respuesta.
    #[error("error de transporte hacia el scoring service: {0}")]
    Transport(String),
    /// La llamada superó el timeout fijo configurado.
    #[error("timeout en la llamada al scoring service")]
    Timeout,
    /// El registro no pudo transformarse en un request válido.
    #[error("registro inválido: {0}")]
    InvalidRecord(#[from] DomainError),
    /// Fallo del backend de la cola (conexión, transacción).
    #[error("backend de la cola de relay: {0}")]
    Queue(String),
}

/// Clase de error a efectos de log y diagnóstico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Reintentar puede resolverlo (red, timeout, 5xx, backend caído).
    Transient,
    /// El mismo registro va a volver a fallar (malformado, rechazo 4xx).
    Permanent,
}

pub fn classify(error: &RelayError) -> ErrorClass {
    match error {
        RelayError::Transport(_) | RelayError::Timeout | RelayError::Queue(_) => {
            ErrorClass::Transient
        }
        RelayError::ServiceRejected { status, .. } if *status >= 500 => ErrorClass::Transient,
        RelayError::ServiceRejected { .. } => ErrorClass::Permanent,
        RelayError::InvalidRecord(_) => ErrorClass::Permanent,
    }
}
