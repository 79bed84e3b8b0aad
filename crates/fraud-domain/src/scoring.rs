//! Formas de wire del contrato HTTP del servicio de scoring.
//!
//! El payload es un objeto plano `nombre de columna -> valor stringificado`
//! más la clave `Time`; la respuesta repite los campos de entrada y agrega
//! `Predicted_Class`. Se usa un `IndexMap` para conservar el orden de
//! inserción de columnas en la serialización y en el log de auditoría.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Request de scoring: `Time` textual y el resto de columnas stringificadas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    #[serde(rename = "Time")]
    pub time: String,
    /// Columnas restantes (V1..V28, Amount, opcionalmente Class).
    #[serde(flatten)]
    pub values: IndexMap<String, String>,
}

impl ScoringRequest {
    pub fn new(time: String) -> Self {
        Self { time, values: IndexMap::new() }
    }

    /// Lee una columna requerida como f64. Falla con error de dominio si la
    /// columna falta o su valor no parsea como número.
    pub fn feature_value(&self, column: &str) -> Result<f64, DomainError> {
        let raw = self.values
                      .get(column)
                      .ok_or_else(|| DomainError::MissingColumn(column.to_string()))?;
        raw.trim()
           .parse::<f64>()
           .map_err(|_| DomainError::NotNumeric { column: column.to_string(), value: raw.clone() })
    }
}

/// Respuesta de scoring: los campos del request más la clase predicha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(flatten)]
    pub values: IndexMap<String, String>,
    #[serde(rename = "Predicted_Class")]
    pub predicted_class: i32,
}

impl ScoringResponse {
    /// Adjunta la predicción a un request ya validado.
    pub fn from_request(request: ScoringRequest, predicted_class: i32) -> Self {
        Self { time: request.time, values: request.values, predicted_class }
    }
}
