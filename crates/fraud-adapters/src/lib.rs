//! fraud-adapters
//!
//! Implementaciones concretas de los contratos de fraud-core que hablan con
//! el mundo exterior. Hoy: el cliente HTTP bloqueante hacia el servicio de
//! scoring.

pub mod http_scoring;

pub use http_scoring::HttpScoringClient;
