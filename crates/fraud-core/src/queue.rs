//! Contrato de la cola de relay y backend en memoria.
//!
//! La cola es un espejo durable y append-only de los registros todavía no
//! confirmados contra el servicio de scoring. El contrato de drenado es
//! transaccional: un lote se reclama en orden FIFO, cada entrega exitosa
//! marca su fila para borrado dentro de la transacción abierta, y el primer
//! fallo revierte el lote completo (ninguna fila se borra). El backend en
//! memoria reproduce exactamente esa semántica para que los tests del
//! poller no necesiten Postgres; la paridad con el backend Pg se valida en
//! los tests de integración de fraud-persistence.

use fraud_domain::TransactionRecord;

use crate::errors::RelayError;

/// Desenlace de un ciclo de drenado.
#[derive(Debug)]
pub enum BatchOutcome {
    /// No había filas elegibles; no se llamó al servicio ni se borró nada.
    Empty,
    /// Todas las entregas del lote tuvieron éxito y sus borrados quedaron
    /// confirmados atómicamente.
    Committed { delivered: usize },
    /// Una entrega falló; la transacción se revirtió completa y las filas
    /// ya entregadas siguen en la cola (serán re-enviadas).
    Aborted {
        failed_id: i64,
        delivered_before: usize,
        error: RelayError,
    },
}

/// Entrada cuarentenada tras agotar los reintentos.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterEntry {
    pub record: TransactionRecord,
    pub attempts: u32,
    pub last_error: String,
}

/// Cola de relay con drenado transaccional por lotes.
///
/// Cualquier mecanismo de captura que garantice exactamente-una-entrada por
/// insert confirmado, dentro de la transacción del insert, satisface el
/// contrato de alimentación de esta cola (trigger en el backend Postgres,
/// acople insert+captura en el backend en memoria).
pub trait RelayQueue {
    /// Reclama hasta `batch_size` filas en orden ascendente de `id` y las
    /// pasa una a una a `deliver`. Semántica todo-o-nada: los borrados se
    /// confirman sólo si todas las entregas devuelven `Ok`; el primer `Err`
    /// detiene el procesamiento y revierte el lote completo.
    ///
    /// `Err` sólo para fallos del backend (no de entrega); un fallo de
    /// entrega es un desenlace normal (`BatchOutcome::Aborted`).
    fn drain_batch(
        &mut self,
        batch_size: usize,
        deliver: &mut dyn FnMut(&TransactionRecord) -> Result<(), RelayError>,
    ) -> Result<BatchOutcome, RelayError>;

    /// Registra un intento fallido para la fila `id` fuera de la transacción
    /// del lote (el contador sobrevive al rollback). Devuelve el total de
    /// intentos acumulados; 0 si la fila ya no está en la cola.
    fn record_failure(&mut self, id: i64) -> Result<u32, RelayError>;

    /// Mueve la fila `id` a la cola de dead-letter (insert + delete en una
    /// transacción). No hace nada si la fila ya no está.
    fn quarantine(&mut self, id: i64, reason: &str) -> Result<(), RelayError>;

    /// Filas pendientes de relay.
    fn depth(&mut self) -> Result<u64, RelayError>;
}

struct QueueRow {
    record: TransactionRecord,
    attempts: u32,
}

/// Backend en memoria con la misma semántica que `PgRelayQueue`.
#[derive(Default)]
pub struct InMemoryRelayQueue {
    rows: Vec<QueueRow>,
    /// Espejo del almacén primario: el insert y la captura ocurren juntos,
    /// igual que el trigger lo garantiza en Postgres.
    primary: Vec<TransactionRecord>,
    dead: Vec<DeadLetterEntry>,
}

impl InMemoryRelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta en el "almacén primario" y captura en la cola dentro de la
    /// misma operación. El `id` lo decide el llamador (ascendente).
    pub fn insert(&mut self, record: TransactionRecord) {
        self.primary.push(record.clone());
        self.rows.push(QueueRow { record, attempts: 0 });
        self.rows.sort_by_key(|row| row.record.id);
    }

    /// Registros confirmados en el almacén primario (para asserts de
    /// completitud de captura).
    pub fn primary_records(&self) -> &[TransactionRecord] {
        &self.primary
    }

    /// Ids actualmente encolados, en orden FIFO.
    pub fn queued_ids(&self) -> Vec<i64> {
        self.rows.iter().map(|row| row.record.id).collect()
    }

    pub fn dead_letters(&self) -> &[DeadLetterEntry] {
        &self.dead
    }
}

impl RelayQueue for InMemoryRelayQueue {
    fn drain_batch(
        &mut self,
        batch_size: usize,
        deliver: &mut dyn FnMut(&TransactionRecord) -> Result<(), RelayError>,
    ) -> Result<BatchOutcome, RelayError> {
        if self.rows.is_empty() {
            return Ok(BatchOutcome::Empty);
        }
        let claimed: Vec<TransactionRecord> = self.rows
                                                  .iter()
                                                  .take(batch_size)
                                                  .map(|row| row.record.clone())
                                                  .collect();
        let mut delivered = 0usize;
        for record in &claimed {
            match deliver(record) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    // Rollback: nada de lo entregado antes se borra.
                    return Ok(BatchOutcome::Aborted { failed_id: record.id,
                                                      delivered_before: delivered,
                                                      error });
                }
            }
        }
        // Commit: borrado atómico de todo el lote.
        let delivered_ids: Vec<i64> = claimed.iter().map(|r| r.id).collect();
        self.rows.retain(|row| !delivered_ids.contains(&row.record.id));
        Ok(BatchOutcome::Committed { delivered })
    }

    fn record_failure(&mut self, id: i64) -> Result<u32, RelayError> {
        match self.rows.iter_mut().find(|row| row.record.id == id) {
            Some(row) => {
                row.attempts += 1;
                Ok(row.attempts)
            }
            None => Ok(0),
        }
    }

    fn quarantine(&mut self, id: i64, reason: &str) -> Result<(), RelayError> {
        if let Some(pos) = self.rows.iter().position(|row| row.record.id == id) {
            let row = self.rows.remove(pos);
            self.dead.push(DeadLetterEntry { record: row.record,
                                             attempts: row.attempts,
                                             last_error: reason.to_string() });
        }
        Ok(())
    }

    fn depth(&mut self) -> Result<u64, RelayError> {
        Ok(self.rows.len() as u64)
    }
}
