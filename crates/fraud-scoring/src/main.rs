//! Binario del servicio de scoring.
//!
//! Carga el artefacto una sola vez, construye el contexto inmutable y sirve
//! los dos endpoints hasta recibir ctrl-c. Un artefacto ausente o inválido
//! aborta el arranque; ningún request individual tumba el proceso.

use std::sync::Arc;

use log::{error, info};

use fraud_scoring::{router, AppState, AuditLog, ScoringConfig, ScoringContext};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let config = ScoringConfig::from_env();
    let context = match ScoringContext::from_path(&config.model_path) {
        Ok(context) => context,
        Err(e) => {
            error!("no se pudo cargar el modelo desde {}: {e}", config.model_path);
            std::process::exit(1);
        }
    };
    info!("modelo cargado: {} features, auditoría en {}",
          context.feature_order().len(),
          config.audit_log_path);

    let state = AppState { context: Arc::new(context),
                           audit: Arc::new(AuditLog::new(&config.audit_log_path)) };
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("no se pudo enlazar {}: {e}", config.bind_addr);
            std::process::exit(1);
        }
    };
    info!("scoring service escuchando en {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!("servidor terminó con error: {e}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("ctrl-c recibido, cerrando scoring service");
}
