//! Cliente HTTP bloqueante del servicio de scoring.
//!
//! Una llamada síncrona por registro, con timeout fijo: el poller procesa
//! en serie y el timeout convierte una llamada colgada en un fallo
//! ordinario del lote. Sólo el status 200 cuenta como entrega aceptada.

use std::time::Duration;

use log::debug;

use fraud_core::{RelayError, ScoringAck, ScoringClient};
use fraud_domain::{ScoringRequest, ScoringResponse};

pub struct HttpScoringClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpScoringClient {
    /// `endpoint` es la URL completa del recurso (p.ej.
    /// `http://127.0.0.1:5000/data`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(format!("no se pudo construir el cliente: {e}")))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ScoringClient for HttpScoringClient {
    fn score(&self, request: &ScoringRequest) -> Result<ScoringAck, RelayError> {
        let response = self.client
                           .post(&self.endpoint)
                           .json(request)
                           .send()
                           .map_err(|e| {
                               if e.is_timeout() {
                                   RelayError::Timeout
                               } else {
                                   RelayError::Transport(e.to_string())
                               }
                           })?;

        let status = response.status().as_u16();
        let body = response.text()
                           .map_err(|e| RelayError::Transport(format!("cuerpo ilegible: {e}")))?;
        if status != 200 {
            return Err(RelayError::ServiceRejected { status, body });
        }

        // `/data` devuelve un array de un registro con Predicted_Class;
        // `/cross_validate` devuelve un mensaje. En ambos casos el 200 ya es
        // la confirmación; la clase parseada es sólo informativa.
        let predicted_class = serde_json::from_str::<Vec<ScoringResponse>>(&body)
            .ok()
            .and_then(|mut records| records.pop())
            .map(|record| record.predicted_class);
        debug!("scoring 200 en {} (Predicted_Class={predicted_class:?})", self.endpoint);
        Ok(ScoringAck { predicted_class })
    }
}
