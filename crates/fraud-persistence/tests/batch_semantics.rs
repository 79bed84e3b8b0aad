//! Semántica transaccional del drenado sobre Postgres: commit atómico del
//! lote, rollback total ante el primer fallo, contador de intentos que
//! sobrevive al rollback y cuarentena/requeue de filas envenenadas.
//! Paridad 1:1 con el backend en memoria de fraud-core.

use fraud_core::{BatchOutcome, RelayError, RelayQueue};
use fraud_persistence::pg::{PgRelayQueue, PgTransactionStore, PoolProvider};

use test_support::{sample_record, truncate_all, with_pool, DB_LOCK};

fn seeded_ids(store: &PgTransactionStore<PoolProvider>, n: usize) -> Vec<i64> {
    (0..n).map(|i| store.insert(&sample_record(10.0 + i as f64)).expect("insert"))
          .collect()
}

#[test]
fn full_batch_success_commits_all_deletions() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let pool = with_pool(|p| p.clone()).unwrap();
    truncate_all(&pool);

    let store = PgTransactionStore::new(PoolProvider { pool: pool.clone() });
    let ids = seeded_ids(&store, 3);
    let mut queue = PgRelayQueue::new(PoolProvider { pool: pool.clone() });

    let mut seen = Vec::new();
    let outcome = queue.drain_batch(100, &mut |record| {
                           seen.push(record.id);
                           Ok(())
                       })
                       .expect("drain");
    assert!(matches!(outcome, BatchOutcome::Committed { delivered: 3 }));
    assert_eq!(seen, ids, "entrega en orden FIFO");
    assert_eq!(queue.depth().unwrap(), 0, "la cola quedó vacía");
    // El almacén primario no se toca: el relay sólo borra de la cola.
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn first_failure_rolls_back_the_whole_batch() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let pool = with_pool(|p| p.clone()).unwrap();
    truncate_all(&pool);

    let store = PgTransactionStore::new(PoolProvider { pool: pool.clone() });
    let ids = seeded_ids(&store, 4);
    let poison = ids[2];
    let mut queue = PgRelayQueue::new(PoolProvider { pool: pool.clone() });

    let mut seen = Vec::new();
    let outcome = queue.drain_batch(100, &mut |record| {
                           seen.push(record.id);
                           if record.id == poison {
                               Err(RelayError::Timeout)
                           } else {
                               Ok(())
                           }
                       })
                       .expect("drain");
    match outcome {
        BatchOutcome::Aborted { failed_id, delivered_before, .. } => {
            assert_eq!(failed_id, poison);
            assert_eq!(delivered_before, 2);
        }
        other => panic!("esperaba Aborted, fue {other:?}"),
    }
    // Se detuvo en el primer fallo y el rollback devolvió TODO el lote.
    assert_eq!(seen, &ids[..3]);
    assert_eq!(queue.depth().unwrap(), 4);

    // At-least-once: el siguiente ciclo re-selecciona el mismo prefijo en
    // el mismo orden.
    let mut resubmitted = Vec::new();
    queue.drain_batch(100, &mut |record| {
             resubmitted.push(record.id);
             Ok(())
         })
         .expect("drain 2");
    assert_eq!(resubmitted, ids);
    assert_eq!(queue.depth().unwrap(), 0);
}

#[test]
fn attempt_counter_survives_rollback_and_feeds_quarantine() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let pool = with_pool(|p| p.clone()).unwrap();
    truncate_all(&pool);

    let store = PgTransactionStore::new(PoolProvider { pool: pool.clone() });
    let ids = seeded_ids(&store, 2);
    let poison = ids[0];
    let mut queue = PgRelayQueue::new(PoolProvider { pool: pool.clone() });

    for expected in 1..=2u32 {
        let outcome = queue.drain_batch(100, &mut |record| {
                               if record.id == poison {
                                   Err(RelayError::Timeout)
                               } else {
                                   Ok(())
                               }
                           })
                           .expect("drain");
        assert!(matches!(outcome, BatchOutcome::Aborted { .. }));
        assert_eq!(queue.record_failure(poison).unwrap(), expected);
    }

    queue.quarantine(poison, "timeout persistente").expect("quarantine");
    assert_eq!(queue.depth().unwrap(), 1, "la fila envenenada salió de la cola");

    let dead = queue.dead_letters(10).expect("dead letters");
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].record.id, poison);
    assert_eq!(dead[0].attempts, 2);
    assert_eq!(dead[0].last_error, "timeout persistente");

    // El resto del lote fluye sin la fila envenenada.
    let outcome = queue.drain_batch(100, &mut |_| Ok(())).expect("drain final");
    assert!(matches!(outcome, BatchOutcome::Committed { delivered: 1 }));

    // Requeue la devuelve con el contador en cero.
    assert!(queue.requeue(poison).expect("requeue"));
    assert_eq!(queue.depth().unwrap(), 1);
    assert_eq!(queue.dead_letter_count().unwrap(), 0);
    assert_eq!(queue.record_failure(poison).unwrap(), 1, "contador reiniciado");
}

#[test]
fn empty_queue_drain_is_a_noop() {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip (no DATABASE_URL)");
        return;
    }
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let pool = with_pool(|p| p.clone()).unwrap();
    truncate_all(&pool);

    let mut queue = PgRelayQueue::new(PoolProvider { pool });
    let mut calls = 0;
    let outcome = queue.drain_batch(100, &mut |_| {
                           calls += 1;
                           Ok(())
                       })
                       .expect("drain");
    assert!(matches!(outcome, BatchOutcome::Empty));
    assert_eq!(calls, 0);
}
