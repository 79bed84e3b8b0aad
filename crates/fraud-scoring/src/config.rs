//! Configuración del servicio leída del entorno.

use std::env;

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Ruta del artefacto de modelo (JSON persistido por el entrenamiento).
    pub model_path: String,
    pub bind_addr: String,
    pub audit_log_path: String,
}

impl ScoringConfig {
    pub fn from_env() -> Self {
        let model_path = env::var("MODEL_PATH").expect("MODEL_PATH no definido");
        let bind_addr = env::var("SCORING_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let audit_log_path = env::var("AUDIT_LOG_PATH")
            .unwrap_or_else(|_| "cross_validate_results.csv".to_string());
        Self { model_path, bind_addr, audit_log_path }
    }
}
