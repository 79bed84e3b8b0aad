//! fraud-domain
//!
//! Tipos de dominio compartidos por todo el pipeline de relay y scoring:
//! el registro de transacción tal como vive en el almacén primario, los
//! nombres canónicos de columnas de features, y las formas de wire
//! (`ScoringRequest`/`ScoringResponse`) del contrato HTTP del servicio de
//! scoring. Este crate no conoce HTTP ni base de datos; sólo datos y su
//! validación.

pub mod columns;
pub mod error;
pub mod scoring;
pub mod transaction;

pub use columns::{scaled_columns, AMOUNT_COLUMN, CLASS_COLUMN, FEATURE_COLUMNS, TIME_COLUMN};
pub use error::DomainError;
pub use scoring::{ScoringRequest, ScoringResponse};
pub use transaction::TransactionRecord;
