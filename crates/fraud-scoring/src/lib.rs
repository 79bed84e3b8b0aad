//! fraud-scoring
//!
//! Servicio de scoring sin estado: transforma un registro por request con
//! parámetros de normalización ajustados offline y persistidos junto al
//! clasificador, aplica el modelo y devuelve el registro aumentado con la
//! clase predicha. El artefacto se carga una sola vez al arranque en un
//! `ScoringContext` inmutable compartido por todos los handlers; ningún
//! request reajusta nada.

pub mod artifact;
pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod routes;

pub use artifact::{ColumnRange, ModelArtifact, ScalerParams};
pub use audit::AuditLog;
pub use config::ScoringConfig;
pub use context::ScoringContext;
pub use error::ScoringError;
pub use routes::{router, AppState};
