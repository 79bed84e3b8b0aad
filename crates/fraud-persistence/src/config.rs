//! Configuración de conexión leída del entorno.
//!
//! Convención `DATABASE_URL` más tamaños opcionales de pool; el archivo
//! `.env` se carga una sola vez, de forma perezosa, la primera vez que algo
//! pide configuración.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("DATABASE_URL").expect("DATABASE_URL no definido");
        let min_connections = env::var("DATABASE_MIN_CONNECTIONS").ok()
                                                                  .and_then(|v| v.parse().ok())
                                                                  .unwrap_or(1);
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS").ok()
                                                                  .and_then(|v| v.parse().ok())
                                                                  .unwrap_or(8);
        Self { url, min_connections, max_connections }
    }
}

/// Forzar la carga temprana de .env desde los binarios si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
