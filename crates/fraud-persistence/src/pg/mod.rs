//! Implementaciones Postgres (Diesel) de los contratos del core.
//!
//! Objetivo del módulo:
//! - `PgRelayQueue`: drenado transaccional de la cola de relay con paridad
//!   semántica 1:1 respecto al backend en memoria de fraud-core (mismo
//!   orden FIFO, mismo todo-o-nada por lote, misma política de cuarentena).
//! - `PgTransactionStore`: inserts en la tabla primaria; la captura hacia
//!   `relay_queue` la hace el trigger dentro de la misma transacción, de
//!   modo que ningún insert confirmado queda sin entrada en la cola.
//! - Utilidades de pool (r2d2) y reintento ante errores transitorios.
//!
//! Decisiones de transacción:
//! - El reclamo usa `FOR UPDATE SKIP LOCKED` sobre `ORDER BY id`: dos
//!   pollers concurrentes nunca reclaman filas solapadas y dentro de un
//!   poller el orden sigue siendo FIFO.
//! - Los borrados por entrega exitosa ocurren dentro de la transacción
//!   abierta del ciclo; el primer fallo de entrega la revierte completa.
//! - El contador de intentos y la cuarentena corren en transacciones
//!   propias, para sobrevivir al rollback del lote.

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::result::Error as DieselError;
use diesel::sql_types::{BigInt, Text};
use log::{debug, warn};

use fraud_core::{BatchOutcome, DeadLetterEntry, RelayError, RelayQueue};
use fraud_domain::TransactionRecord;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{dead_letter, relay_queue, transactions};

/// Alias para el pool r2d2 de conexiones Postgres. Al construirlo se corre
/// el set de migraciones pendientes (una sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción / tests de integración) o
/// factorear en tests sin acoplar a r2d2. Contrato: devuelve una conexión
/// lista o `PersistenceError::TransientIo` equivalente.
pub trait ConnectionProvider: Send + 'static {
    fn connection(&self)
        -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación de provider respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self)
        -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila de la tabla primaria `transactions` (y prefijo de `relay_queue` /
/// `dead_letter`, que la espejan columna a columna).
#[derive(Queryable, Debug)]
pub struct TransactionRow {
    pub id: i64,
    pub time_stamp: f64,
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub v4: f64,
    pub v5: f64,
    pub v6: f64,
    pub v7: f64,
    pub v8: f64,
    pub v9: f64,
    pub v10: f64,
    pub v11: f64,
    pub v12: f64,
    pub v13: f64,
    pub v14: f64,
    pub v15: f64,
    pub v16: f64,
    pub v17: f64,
    pub v18: f64,
    pub v19: f64,
    pub v20: f64,
    pub v21: f64,
    pub v22: f64,
    pub v23: f64,
    pub v24: f64,
    pub v25: f64,
    pub v26: f64,
    pub v27: f64,
    pub v28: f64,
    pub amount: f64,
    pub class: Option<i32>,
}

impl TransactionRow {
    pub fn to_record(&self) -> TransactionRecord {
        TransactionRecord { id: self.id,
                            time_stamp: self.time_stamp,
                            features: [self.v1, self.v2, self.v3, self.v4, self.v5, self.v6,
                                       self.v7, self.v8, self.v9, self.v10, self.v11, self.v12,
                                       self.v13, self.v14, self.v15, self.v16, self.v17,
                                       self.v18, self.v19, self.v20, self.v21, self.v22,
                                       self.v23, self.v24, self.v25, self.v26, self.v27,
                                       self.v28],
                            amount: self.amount,
                            class: self.class }
    }
}

// Tuplas planas (una por columna) que reflejan la forma de fila que Diesel
// deserializa desde `relay_queue` / `dead_letter`. Los `Queryable` manuales de
// más abajo reempaquetan esta fila plana en los structs anidados, porque el
// derive de `Queryable` no aplana campos `#[diesel(embed)]` y reusamos
// `TransactionRow` (ligado a columnas) en las tres tablas.
type QueueRowFlat = (i64,
                     f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64,
                     f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64,
                     Option<i32>,
                     i32);

type DeadLetterRowFlat = (i64,
                          f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64,
                          f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64,
                          f64, f64,
                          Option<i32>,
                          i32,
                          String,
                          chrono::DateTime<chrono::Utc>);

/// Fila de `relay_queue` para lecturas (columnas primarias + contador).
#[derive(Debug)]
pub struct QueueRow {
    pub row: TransactionRow,
    pub attempts: i32,
}

impl<__DB, __ST> Queryable<__ST, __DB> for QueueRow
    where __DB: diesel::backend::Backend,
          QueueRowFlat: Queryable<__ST, __DB>
{
    type Row = <QueueRowFlat as Queryable<__ST, __DB>>::Row;

    fn build(row: Self::Row) -> diesel::deserialize::Result<Self> {
        let (id, time_stamp, v1, v2, v3, v4, v5, v6, v7, v8, v9, v10, v11, v12, v13, v14, v15,
             v16, v17, v18, v19, v20, v21, v22, v23, v24, v25, v26, v27, v28, amount, class,
             attempts) = <QueueRowFlat as Queryable<__ST, __DB>>::build(row)?;
        Ok(Self { row: TransactionRow { id, time_stamp, v1, v2, v3, v4, v5, v6, v7, v8, v9, v10,
                                        v11, v12, v13, v14, v15, v16, v17, v18, v19, v20, v21,
                                        v22, v23, v24, v25, v26, v27, v28, amount, class },
                  attempts })
    }
}

/// Fila de `dead_letter` para lecturas.
#[derive(Debug)]
pub struct DeadLetterRow {
    pub row: TransactionRow,
    pub attempts: i32,
    pub last_error: String,
    pub quarantined_at: chrono::DateTime<chrono::Utc>,
}

impl<__DB, __ST> Queryable<__ST, __DB> for DeadLetterRow
    where __DB: diesel::backend::Backend,
          DeadLetterRowFlat: Queryable<__ST, __DB>
{
    type Row = <DeadLetterRowFlat as Queryable<__ST, __DB>>::Row;

    fn build(row: Self::Row) -> diesel::deserialize::Result<Self> {
        let (id, time_stamp, v1, v2, v3, v4, v5, v6, v7, v8, v9, v10, v11, v12, v13, v14, v15,
             v16, v17, v18, v19, v20, v21, v22, v23, v24, v25, v26, v27, v28, amount, class,
             attempts, last_error, quarantined_at) =
            <DeadLetterRowFlat as Queryable<__ST, __DB>>::build(row)?;
        Ok(Self { row: TransactionRow { id, time_stamp, v1, v2, v3, v4, v5, v6, v7, v8, v9, v10,
                                        v11, v12, v13, v14, v15, v16, v17, v18, v19, v20, v21,
                                        v22, v23, v24, v25, v26, v27, v28, amount, class },
                  attempts,
                  last_error,
                  quarantined_at })
    }
}

impl DeadLetterRow {
    pub fn to_entry(&self) -> DeadLetterEntry {
        DeadLetterEntry { record: self.row.to_record(),
                          attempts: self.attempts.max(0) as u32,
                          last_error: self.last_error.clone() }
    }
}

/// Estructura de inserción en la tabla primaria (`id` lo asigna la base).
#[derive(Insertable, Debug)]
#[diesel(table_name = transactions)]
pub struct NewTransactionRow {
    pub time_stamp: f64,
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub v4: f64,
    pub v5: f64,
    pub v6: f64,
    pub v7: f64,
    pub v8: f64,
    pub v9: f64,
    pub v10: f64,
    pub v11: f64,
    pub v12: f64,
    pub v13: f64,
    pub v14: f64,
    pub v15: f64,
    pub v16: f64,
    pub v17: f64,
    pub v18: f64,
    pub v19: f64,
    pub v20: f64,
    pub v21: f64,
    pub v22: f64,
    pub v23: f64,
    pub v24: f64,
    pub v25: f64,
    pub v26: f64,
    pub v27: f64,
    pub v28: f64,
    pub amount: f64,
    pub class: Option<i32>,
}

impl NewTransactionRow {
    /// El `id` del registro se ignora: lo asigna el BIGSERIAL primario.
    pub fn from_record(record: &TransactionRecord) -> Self {
        let f = &record.features;
        Self { time_stamp: record.time_stamp,
               v1: f[0], v2: f[1], v3: f[2], v4: f[3], v5: f[4], v6: f[5], v7: f[6],
               v8: f[7], v9: f[8], v10: f[9], v11: f[10], v12: f[11], v13: f[12],
               v14: f[13], v15: f[14], v16: f[15], v17: f[16], v18: f[17], v19: f[18],
               v20: f[19], v21: f[20], v22: f[21], v23: f[22], v24: f[23], v25: f[24],
               v26: f[25], v27: f[26], v28: f[27],
               amount: record.amount,
               class: record.class }
    }
}

/// Columnas de negocio compartidas por las tres tablas, para las sentencias
/// de movimiento entre cola y dead-letter.
const BUSINESS_COLUMNS: &str = "id, time_stamp, v1, v2, v3, v4, v5, v6, v7, v8, v9, v10, \
                                v11, v12, v13, v14, v15, v16, v17, v18, v19, v20, v21, v22, \
                                v23, v24, v25, v26, v27, v28, amount, class";

/// Determina si un error amerita reintento con backoff.
fn is_retryable(e: &PersistenceError) -> bool {
    matches!(e,
             PersistenceError::SerializationConflict | PersistenceError::TransientIo(_))
}

/// Reintento con backoff pequeño (hasta 3 intentos) para operaciones cortas
/// fuera del ciclo del lote (contador, cuarentena, conteos, inserts).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Razón por la que la transacción del lote terminó en rollback.
enum DrainAbort {
    /// Una entrega falló: rollback deliberado del ciclo.
    Delivery {
        failed_id: i64,
        delivered_before: usize,
        error: RelayError,
    },
    /// Fallo del propio backend.
    Db(DieselError),
}

impl From<DieselError> for DrainAbort {
    fn from(e: DieselError) -> Self {
        Self::Db(e)
    }
}

fn queue_error(e: PersistenceError) -> RelayError {
    RelayError::Queue(e.to_string())
}

/// Cola de relay sobre Postgres.
pub struct PgRelayQueue<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgRelayQueue<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Entradas cuarentenadas, las más antiguas primero.
    pub fn dead_letters(&self, limit: i64) -> Result<Vec<DeadLetterEntry>, PersistenceError> {
        let rows: Vec<DeadLetterRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            dead_letter::table.order(dead_letter::quarantined_at.asc())
                              .limit(limit)
                              .load(&mut conn)
                              .map_err(PersistenceError::from)
        })?;
        Ok(rows.iter().map(DeadLetterRow::to_entry).collect())
    }

    /// Devuelve una fila cuarentenada a la cola con el contador en cero.
    /// `Ok(false)` si el id no está en dead-letter.
    pub fn requeue(&self, id: i64) -> Result<bool, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    let moved = diesel::sql_query(format!(
                        "INSERT INTO relay_queue ({BUSINESS_COLUMNS}, attempts) \
                         SELECT {BUSINESS_COLUMNS}, 0 FROM dead_letter WHERE id = $1 \
                         ON CONFLICT DO NOTHING"
                    ))
                    .bind::<BigInt, _>(id)
                    .execute(tx)?;
                    diesel::delete(dead_letter::table.find(id)).execute(tx)?;
                    Ok::<bool, DieselError>(moved > 0)
                })
                .map_err(PersistenceError::from)
        })
    }

    pub fn dead_letter_count(&self) -> Result<u64, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            dead_letter::table.count()
                              .get_result::<i64>(&mut conn)
                              .map(|n| n.max(0) as u64)
                              .map_err(PersistenceError::from)
        })
    }
}

impl<P: ConnectionProvider> RelayQueue for PgRelayQueue<P> {
    fn drain_batch(
        &mut self,
        batch_size: usize,
        deliver: &mut dyn FnMut(&TransactionRecord) -> Result<(), RelayError>,
    ) -> Result<BatchOutcome, RelayError> {
        let mut conn = self.provider.connection().map_err(queue_error)?;
        let result = conn.build_transaction().read_write().run(|tx| {
            // CLAIMING: lote FIFO; SKIP LOCKED evita solaparse con otro
            // poller sin bloquear el reclamo.
            let rows: Vec<QueueRow> = relay_queue::table.order(relay_queue::id.asc())
                                                        .limit(batch_size as i64)
                                                        .for_update()
                                                        .skip_locked()
                                                        .load(tx)?;
            if rows.is_empty() {
                return Ok(None);
            }
            debug!("lote reclamado: {} filas (primera id={})",
                   rows.len(),
                   rows[0].row.id);
            // PROCESSING: entrega en orden; el borrado queda dentro de la
            // transacción abierta hasta el commit del lote completo.
            let mut delivered = 0usize;
            for queue_row in &rows {
                let record = queue_row.row.to_record();
                match deliver(&record) {
                    Ok(()) => {
                        diesel::delete(relay_queue::table.find(record.id)).execute(tx)?;
                        delivered += 1;
                    }
                    Err(error) => {
                        return Err(DrainAbort::Delivery { failed_id: record.id,
                                                          delivered_before: delivered,
                                                          error });
                    }
                }
            }
            Ok(Some(delivered))
        });
        match result {
            Ok(None) => Ok(BatchOutcome::Empty),
            Ok(Some(delivered)) => Ok(BatchOutcome::Committed { delivered }),
            Err(DrainAbort::Delivery { failed_id, delivered_before, error }) => {
                Ok(BatchOutcome::Aborted { failed_id, delivered_before, error })
            }
            Err(DrainAbort::Db(e)) => Err(queue_error(PersistenceError::from(e))),
        }
    }

    fn record_failure(&mut self, id: i64) -> Result<u32, RelayError> {
        let attempts = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(relay_queue::table.find(id))
                .set(relay_queue::attempts.eq(relay_queue::attempts + 1))
                .returning(relay_queue::attempts)
                .get_result::<i32>(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })
        .map_err(queue_error)?;
        Ok(attempts.unwrap_or(0).max(0) as u32)
    }

    fn quarantine(&mut self, id: i64, reason: &str) -> Result<(), RelayError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx| {
                    diesel::sql_query(format!(
                        "INSERT INTO dead_letter ({BUSINESS_COLUMNS}, attempts, last_error) \
                         SELECT {BUSINESS_COLUMNS}, attempts, $2 FROM relay_queue WHERE id = $1 \
                         ON CONFLICT DO NOTHING"
                    ))
                    .bind::<BigInt, _>(id)
                    .bind::<Text, _>(reason)
                    .execute(tx)?;
                    diesel::delete(relay_queue::table.find(id)).execute(tx)?;
                    Ok::<(), DieselError>(())
                })
                .map_err(PersistenceError::from)
        })
        .map_err(queue_error)
    }

    fn depth(&mut self) -> Result<u64, RelayError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            relay_queue::table.count()
                              .get_result::<i64>(&mut conn)
                              .map(|n| n.max(0) as u64)
                              .map_err(PersistenceError::from)
        })
        .map_err(queue_error)
    }
}

/// Almacén primario de transacciones.
///
/// El insert dispara el trigger de captura: la entrada en `relay_queue`
/// nace (o muere) con la misma transacción que la fila primaria.
pub struct PgTransactionStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgTransactionStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Inserta y devuelve el id asignado por la base.
    pub fn insert(&self, record: &TransactionRecord) -> Result<i64, PersistenceError> {
        let new_row = NewTransactionRow::from_record(record);
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(transactions::table)
                .values(&new_row)
                .returning(transactions::id)
                .get_result::<i64>(&mut conn)
                .map_err(PersistenceError::from)
        })
    }

    pub fn find(&self, id: i64) -> Result<Option<TransactionRecord>, PersistenceError> {
        let row: Option<TransactionRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            transactions::table.find(id)
                               .first(&mut conn)
                               .optional()
                               .map_err(PersistenceError::from)
        })?;
        Ok(row.map(|r| r.to_record()))
    }

    pub fn count(&self) -> Result<u64, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            transactions::table.count()
                               .get_result::<i64>(&mut conn)
                               .map(|n| n.max(0) as u64)
                               .map_err(PersistenceError::from)
        })
    }
}

/// Construye un pool Postgres r2d2 a partir de URL.
///
/// Ajusta tamaños inválidos (`min > max` colapsa a `max`) y ejecuta las
/// migraciones pendientes en el primer checkout.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración y construye un
/// pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
