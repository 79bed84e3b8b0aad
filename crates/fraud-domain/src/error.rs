//! Errores de validación del dominio.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DomainError {
    #[error("columna requerida ausente: {0}")]
    MissingColumn(String),
    #[error("valor no numérico en {column}: {value}")]
    NotNumeric { column: String, value: String },
}
