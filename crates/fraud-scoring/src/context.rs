//! Contexto de scoring inmutable.
//!
//! Se construye una sola vez al arranque (artefacto validado) y se comparte
//! en read-only entre todos los handlers: no hay estado mutable de modelo
//! ni de scaler, así que la inferencia no necesita locks y es idempotente
//! por construcción.

use std::path::Path;

use fraud_domain::ScoringRequest;

use crate::artifact::ModelArtifact;
use crate::error::ScoringError;

pub struct ScoringContext {
    artifact: ModelArtifact,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ScoringContext {
    pub fn new(artifact: ModelArtifact) -> Result<Self, ScoringError> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        Ok(Self { artifact: ModelArtifact::from_path(path.as_ref())? })
    }

    pub fn feature_order(&self) -> &[String] {
        &self.artifact.feature_order
    }

    /// Preprocesa e infiere sobre un registro.
    ///
    /// Los campos identificadores (`Time`, `Class`) no participan: sólo se
    /// leen las columnas del orden de features del artefacto. Cada valor se
    /// reescala con los parámetros persistidos y el modelo logístico decide
    /// la clase con umbral 0.5.
    pub fn score(&self, request: &ScoringRequest) -> Result<i32, ScoringError> {
        let mut z = self.artifact.intercept;
        for (feature, coefficient) in self.artifact
                                          .feature_order
                                          .iter()
                                          .zip(self.artifact.coefficients.iter())
        {
            let raw = request.feature_value(feature)?;
            z += coefficient * self.artifact.scaler.rescale(feature, raw)?;
        }
        Ok(if sigmoid(z) >= 0.5 { 1 } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ColumnRange, ScalerParams};
    use indexmap::IndexMap;

    fn context() -> ScoringContext {
        let mut columns = IndexMap::new();
        columns.insert("Amount".to_string(), ColumnRange { min: 0.0, max: 100.0 });
        columns.insert("V1".to_string(), ColumnRange { min: -2.0, max: 2.0 });
        let artifact = ModelArtifact { feature_order: vec!["Amount".into(), "V1".into()],
                                       coefficients: vec![0.05, 0.0],
                                       intercept: 0.0,
                                       scaler: ScalerParams { low: -120.0,
                                                              high: 120.0,
                                                              columns } };
        ScoringContext::new(artifact).unwrap()
    }

    fn request(amount: &str, v1: &str) -> ScoringRequest {
        let mut request = ScoringRequest::new("2023-11-14 22:13:20".to_string());
        request.values.insert("Amount".to_string(), amount.to_string());
        request.values.insert("V1".to_string(), v1.to_string());
        request
    }

    #[test]
    fn scoring_is_deterministic_and_idempotent() {
        let ctx = context();
        let req = request("80.0", "0.3");
        let first = ctx.score(&req).unwrap();
        let second = ctx.score(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn threshold_splits_classes() {
        let ctx = context();
        // Amount 80 -> escala a 72 -> z = 3.6 -> clase 1.
        assert_eq!(ctx.score(&request("80.0", "0.0")).unwrap(), 1);
        // Amount 20 -> escala a -72 -> z = -3.6 -> clase 0.
        assert_eq!(ctx.score(&request("20.0", "0.0")).unwrap(), 0);
    }

    #[test]
    fn single_record_does_not_refit_the_scaler() {
        let ctx = context();
        // Si el scaler se reajustara con el registro entrante, todo valor
        // colapsaría al borde del rango y ambos requests darían lo mismo.
        // Con parámetros persistidos, montos distintos escalan distinto.
        let low = ctx.score(&request("10.0", "0.0")).unwrap();
        let high = ctx.score(&request("90.0", "0.0")).unwrap();
        assert_ne!(low, high);
    }

    #[test]
    fn missing_feature_column_is_a_domain_error() {
        let ctx = context();
        let mut req = request("10.0", "0.0");
        req.values.shift_remove("V1");
        assert!(matches!(ctx.score(&req), Err(ScoringError::Domain(_))));
    }

    #[test]
    fn non_numeric_value_is_a_domain_error() {
        let ctx = context();
        let req = request("diez", "0.0");
        assert!(matches!(ctx.score(&req), Err(ScoringError::Domain(_))));
    }

    #[test]
    fn extra_columns_like_time_and_class_are_ignored() {
        let ctx = context();
        let mut req = request("20.0", "0.0");
        req.values.insert("Class".to_string(), "1".to_string());
        assert_eq!(ctx.score(&req).unwrap(), 0);
    }
}
