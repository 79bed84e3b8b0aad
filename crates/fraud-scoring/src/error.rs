//! Errores del servicio de scoring. Toda falla de procesamiento termina en
//! una respuesta JSON `{"error": ...}` con status 500; sólo los errores de
//! carga del artefacto abortan el arranque.

use fraud_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("no se pudo leer el artefacto {path}: {source}")]
    ArtifactIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("artefacto de modelo inválido: {0}")]
    InvalidArtifact(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("log de auditoría: {0}")]
    Audit(String),
}
