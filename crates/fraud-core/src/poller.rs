//! Poller de relay: drena la cola hacia el servicio de scoring.
//!
//! Loop secuencial único (una sola llamada de red en vuelo) con entrega
//! at-least-once y commit todo-o-nada por ciclo. Tras un aborto el poller
//! registra el intento fallido fuera de la transacción revertida y, agotado
//! el presupuesto de reintentos, cuarentena la fila envenenada a dead-letter
//! para que deje de bloquear su lote.

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::client::ScoringClient;
use crate::errors::{classify, RelayError};
use crate::queue::{BatchOutcome, RelayQueue};
use crate::shutdown::ShutdownToken;

/// Parámetros del loop. Los defaults replican el comportamiento del sistema
/// original (lotes de 100, 5 segundos de idle y de backoff).
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
    /// Intentos fallidos tolerados antes de cuarentenar una fila.
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { batch_size: 100,
               poll_interval: Duration::from_secs(5),
               retry_backoff: Duration::from_secs(5),
               max_attempts: 5 }
    }
}

impl PollerConfig {
    /// Lee overrides desde el entorno (`RELAY_BATCH_SIZE`,
    /// `RELAY_POLL_INTERVAL_SECS`, `RELAY_RETRY_BACKOFF_SECS`,
    /// `RELAY_MAX_ATTEMPTS`); valores ausentes o no parseables caen al
    /// default.
    pub fn from_env() -> Self {
        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok().and_then(|v| v.parse().ok())
        }
        let defaults = Self::default();
        Self { batch_size: parsed("RELAY_BATCH_SIZE").unwrap_or(defaults.batch_size),
               poll_interval: parsed("RELAY_POLL_INTERVAL_SECS").map(Duration::from_secs)
                                                                .unwrap_or(defaults.poll_interval),
               retry_backoff: parsed("RELAY_RETRY_BACKOFF_SECS").map(Duration::from_secs)
                                                                .unwrap_or(defaults.retry_backoff),
               max_attempts: parsed("RELAY_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts) }
    }
}

/// Desenlace de un ciclo, ya con la política de reintentos aplicada.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Cola vacía: ni llamadas ni borrados.
    Idle,
    /// Lote completo entregado y borrado.
    Committed { delivered: usize },
    /// Lote revertido por el fallo de una fila.
    Aborted {
        failed_id: i64,
        attempts: u32,
        quarantined: bool,
    },
}

pub struct RelayPoller<Q: RelayQueue, C: ScoringClient> {
    queue: Q,
    client: C,
    config: PollerConfig,
}

impl<Q: RelayQueue, C: ScoringClient> RelayPoller<Q, C> {
    pub fn new(queue: Q, client: C, config: PollerConfig) -> Self {
        Self { queue, client, config }
    }

    /// Ejecuta un ciclo CLAIMING -> PROCESSING -> (COMMIT | ABORT).
    ///
    /// `Err` sólo ante fallos del backend de la cola; los fallos de entrega
    /// quedan absorbidos en `CycleOutcome::Aborted`.
    pub fn cycle(&mut self) -> Result<CycleOutcome, RelayError> {
        let queue = &mut self.queue;
        let client = &self.client;
        let outcome = queue.drain_batch(self.config.batch_size, &mut |record| {
                               let request = record.to_scoring_request();
                               let ack = client.score(&request)?;
                               debug!("registro {} aceptado (Predicted_Class={:?})",
                                      record.id, ack.predicted_class);
                               Ok(())
                           })?;
        match outcome {
            BatchOutcome::Empty => Ok(CycleOutcome::Idle),
            BatchOutcome::Committed { delivered } => {
                info!("lote confirmado: {delivered} registros relevados");
                Ok(CycleOutcome::Committed { delivered })
            }
            BatchOutcome::Aborted { failed_id, delivered_before, error } => {
                warn!("lote revertido en el registro {failed_id} \
                       ({delivered_before} entregas descartadas): {error} [{:?}]",
                      classify(&error));
                let attempts = self.queue.record_failure(failed_id)?;
                let quarantined = attempts >= self.config.max_attempts;
                if quarantined {
                    self.queue.quarantine(failed_id, &error.to_string())?;
                    warn!("registro {failed_id} cuarentenado tras {attempts} intentos");
                }
                Ok(CycleOutcome::Aborted { failed_id, attempts, quarantined })
            }
        }
    }

    /// Loop principal: corre ciclos hasta que `shutdown` se dispare. Nunca
    /// tumba el proceso por un fallo de registro, lote o conectividad;
    /// degrada a reintento con backoff.
    pub fn run(&mut self, shutdown: &ShutdownToken) {
        info!("relay poller iniciado (batch_size={}, poll_interval={:?})",
              self.config.batch_size, self.config.poll_interval);
        while !shutdown.is_shutdown() {
            let wait = match self.cycle() {
                Ok(CycleOutcome::Committed { .. }) => Duration::ZERO,
                Ok(CycleOutcome::Idle) => self.config.poll_interval,
                Ok(CycleOutcome::Aborted { .. }) => self.config.retry_backoff,
                Err(error) => {
                    error!("fallo del backend de la cola: {error}");
                    self.config.retry_backoff
                }
            };
            if !wait.is_zero() && shutdown.wait_timeout(wait) {
                break;
            }
        }
        info!("relay poller detenido");
    }

    /// Acceso mutable a la cola y al cliente (inspección en tests).
    pub fn parts_mut(&mut self) -> (&mut Q, &mut C) {
        (&mut self.queue, &mut self.client)
    }

    /// Desarma el poller devolviendo sus piezas (para inspección en tests).
    pub fn into_parts(self) -> (Q, C) {
        (self.queue, self.client)
    }
}
