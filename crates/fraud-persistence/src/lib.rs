//! fraud-persistence
//!
//! Backend Postgres (Diesel) del pipeline de relay: esquema de las tablas
//! `transactions`, `relay_queue` y `dead_letter`, migraciones embebidas
//! (incluido el trigger de captura), la implementación `PgRelayQueue` del
//! contrato de drenado transaccional de fraud-core y utilidades de pool y
//! configuración.
//!
//! Módulos:
//! - `pg`: implementaciones sobre Postgres (cola de relay, almacén primario).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgPool, PgRelayQueue,
             PgTransactionStore, PoolProvider};
