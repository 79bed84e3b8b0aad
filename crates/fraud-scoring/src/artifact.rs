//! Artefacto de modelo persistido.
//!
//! Producido offline junto al entrenamiento: orden de features, coeficientes
//! e intercepto de la regresión logística, y los parámetros de normalización
//! min/max ajustados UNA vez sobre el dataset de calibración. El servicio
//! los reutiliza sin cambios en cada inferencia; reajustar el scaler con el
//! registro entrante colapsaría cada feature al borde del rango y haría las
//! predicciones irreproducibles.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// Rango ajustado de una columna (mínimo y máximo observados en el dataset
/// de calibración).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

/// Parámetros del reescalado afín por columna hacia `[low, high]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub low: f64,
    pub high: f64,
    pub columns: IndexMap<String, ColumnRange>,
}

impl ScalerParams {
    /// Aplica la transformación afín fija a un valor crudo:
    /// `low + (x - min) * (high - low) / (max - min)`.
    ///
    /// Una columna degenerada (`max == min` en calibración) mapea siempre a
    /// `low`, de forma determinista.
    pub fn rescale(&self, column: &str, value: f64) -> Result<f64, ScoringError> {
        let range = self.columns.get(column).ok_or_else(|| {
            ScoringError::InvalidArtifact(format!("columna sin parámetros de escala: {column}"))
        })?;
        let span = range.max - range.min;
        if span <= 0.0 {
            return Ok(self.low);
        }
        Ok(self.low + (value - range.min) * (self.high - self.low) / span)
    }
}

/// Clasificador + scaler persistidos, tal como los dejó el entrenamiento.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Orden de las features tal como fue entrenado el modelo.
    pub feature_order: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub scaler: ScalerParams,
}

impl ModelArtifact {
    pub fn from_path(path: &Path) -> Result<Self, ScoringError> {
        let raw = fs::read_to_string(path).map_err(|source| ScoringError::ArtifactIo {
            path: path.display().to_string(),
            source,
        })?;
        let artifact: Self = serde_json::from_str(&raw)
            .map_err(|e| ScoringError::InvalidArtifact(format!("JSON inválido: {e}")))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Consistencia interna: un coeficiente por feature, todas las features
    /// con parámetros de escala y un rango de destino no vacío.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.feature_order.is_empty() {
            return Err(ScoringError::InvalidArtifact("sin features".into()));
        }
        if self.coefficients.len() != self.feature_order.len() {
            return Err(ScoringError::InvalidArtifact(format!(
                "{} coeficientes para {} features",
                self.coefficients.len(),
                self.feature_order.len()
            )));
        }
        if self.scaler.high <= self.scaler.low {
            return Err(ScoringError::InvalidArtifact(format!(
                "rango de escala vacío: [{}, {}]",
                self.scaler.low, self.scaler.high
            )));
        }
        for feature in &self.feature_order {
            let range = self.scaler.columns.get(feature).ok_or_else(|| {
                ScoringError::InvalidArtifact(format!("feature sin rango ajustado: {feature}"))
            })?;
            if range.max < range.min {
                return Err(ScoringError::InvalidArtifact(format!(
                    "rango invertido en {feature}: [{}, {}]",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}
