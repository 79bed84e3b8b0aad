//! Daemon del relay poller.
//!
//! Cablea el pipeline completo: pool Postgres (cola de relay alimentada por
//! el trigger de captura), cliente HTTP bloqueante hacia el servicio de
//! scoring y el loop secuencial del poller. El loop corre en un hilo
//! bloqueante; ctrl-c dispara el token de apagado y el ciclo en vuelo
//! termina o aborta limpio antes de salir.

use std::time::Duration;

use log::{error, info};

use fraud_adapters::HttpScoringClient;
use fraud_core::{PollerConfig, RelayPoller, ShutdownToken};
use fraud_persistence::{build_pool, DbConfig, PgRelayQueue, PoolProvider};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let db = DbConfig::from_env();
    let pool = match build_pool(&db.url, db.min_connections, db.max_connections) {
        Ok(pool) => pool,
        Err(e) => {
            error!("no se pudo inicializar la base: {e}");
            std::process::exit(1);
        }
    };

    let config = PollerConfig::from_env();
    let scoring_url = std::env::var("SCORING_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:5000/data".to_string());
    let timeout_secs: u64 = std::env::var("SCORING_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let client = match HttpScoringClient::new(&scoring_url, Duration::from_secs(timeout_secs)) {
        Ok(client) => client,
        Err(e) => {
            error!("no se pudo construir el cliente de scoring: {e}");
            std::process::exit(1);
        }
    };
    info!("relay daemon: scoring en {scoring_url} (timeout {timeout_secs}s), lotes de {}",
          config.batch_size);

    let queue = PgRelayQueue::new(PoolProvider { pool });
    let shutdown = ShutdownToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c recibido, deteniendo relay poller");
            signal_token.shutdown();
        }
    });

    let mut poller = RelayPoller::new(queue, client, config);
    let worker = tokio::task::spawn_blocking(move || poller.run(&shutdown));
    if let Err(e) = worker.await {
        error!("el poller terminó con panic: {e}");
        std::process::exit(1);
    }
}
