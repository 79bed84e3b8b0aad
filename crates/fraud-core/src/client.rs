//! Contrato del cliente hacia el servicio de scoring.

use fraud_domain::ScoringRequest;

use crate::errors::RelayError;

/// Resultado de una entrega aceptada (HTTP 200). La clase predicha viene
/// informativa cuando el endpoint la devuelve en el cuerpo; el poller sólo
/// la usa para logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringAck {
    pub predicted_class: Option<i32>,
}

/// Cliente síncrono de scoring: una llamada, un registro, sin concurrencia.
///
/// Contrato: `Ok` únicamente cuando el servicio aceptó el registro con
/// status 200; cualquier otro desenlace (status distinto, fallo de red,
/// timeout) debe devolver el `RelayError` correspondiente para que el
/// poller aborte el lote en curso.
pub trait ScoringClient {
    fn score(&self, request: &ScoringRequest) -> Result<ScoringAck, RelayError>;
}
