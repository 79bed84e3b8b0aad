//! Propiedades del poller sobre el backend en memoria: atomicidad de lote,
//! entrega at-least-once, equidad FIFO, borde de cola vacía y política de
//! cuarentena. El backend Pg replica la misma semántica (ver tests de
//! integración de fraud-persistence).

use std::cell::RefCell;
use std::time::Duration;

use fraud_core::{CycleOutcome, InMemoryRelayQueue, PollerConfig, RelayError, RelayPoller,
                 RelayQueue, ScoringAck, ScoringClient, ShutdownToken};
use fraud_domain::{ScoringRequest, TransactionRecord};

fn record(id: i64) -> TransactionRecord {
    TransactionRecord { id,
                        time_stamp: 1_700_000_000.0 + id as f64,
                        features: [0.0; 28],
                        amount: id as f64,
                        class: Some(0) }
}

/// Cliente guionado: falla para los montos listados, registra el orden de
/// llamadas. El monto stringificado identifica al registro (el wire no
/// lleva id).
struct ScriptedClient {
    fail_amounts: RefCell<Vec<String>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedClient {
    fn new(fail_amounts: &[i64]) -> Self {
        Self { fail_amounts: RefCell::new(fail_amounts.iter().map(|a| a.to_string()).collect()),
               calls: RefCell::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn heal(&self) {
        self.fail_amounts.borrow_mut().clear();
    }
}

impl ScoringClient for ScriptedClient {
    fn score(&self, request: &ScoringRequest) -> Result<ScoringAck, RelayError> {
        let amount = request.values.get("Amount").cloned().unwrap_or_default();
        self.calls.borrow_mut().push(amount.clone());
        if self.fail_amounts.borrow().contains(&amount) {
            return Err(RelayError::ServiceRejected { status: 500, body: "boom".into() });
        }
        Ok(ScoringAck { predicted_class: Some(0) })
    }
}

fn config(batch_size: usize, max_attempts: u32) -> PollerConfig {
    PollerConfig { batch_size,
                   poll_interval: Duration::from_millis(1),
                   retry_backoff: Duration::from_millis(1),
                   max_attempts }
}

#[test]
fn batch_atomicity_failure_keeps_all_rows() {
    let mut queue = InMemoryRelayQueue::new();
    for id in 1..=5 {
        queue.insert(record(id));
    }
    let mut poller = RelayPoller::new(queue, ScriptedClient::new(&[3]), config(100, 10));

    let outcome = poller.cycle().unwrap();
    assert!(matches!(outcome, CycleOutcome::Aborted { failed_id: 3, .. }));

    let (mut queue, client) = poller.into_parts();
    // Se detuvo en el primer fallo: no se llamó por las filas 4 y 5.
    assert_eq!(client.calls(), vec!["1", "2", "3"]);
    // Rollback completo: las 5 filas siguen en la cola.
    assert_eq!(queue.queued_ids(), vec![1, 2, 3, 4, 5]);
    assert_eq!(queue.depth().unwrap(), 5);
}

#[test]
fn at_least_once_resubmits_same_leading_rows_in_order() {
    let mut queue = InMemoryRelayQueue::new();
    for id in 1..=4 {
        queue.insert(record(id));
    }
    let mut poller = RelayPoller::new(queue, ScriptedClient::new(&[4]), config(100, 10));

    poller.cycle().unwrap(); // aborta en la fila 4
    {
        let (_, client) = poller.parts_mut();
        client.heal();
    }
    let outcome = poller.cycle().unwrap();
    assert!(matches!(outcome, CycleOutcome::Committed { delivered: 4 }));

    let (mut queue, client) = poller.into_parts();
    // Mismo prefijo, mismo orden, en ambos ciclos.
    assert_eq!(client.calls(), vec!["1", "2", "3", "4", "1", "2", "3", "4"]);
    assert_eq!(queue.depth().unwrap(), 0);
}

#[test]
fn fifo_claims_in_non_decreasing_id_order() {
    let mut queue = InMemoryRelayQueue::new();
    for id in [7, 2, 9, 4] {
        queue.insert(record(id));
    }
    let mut poller = RelayPoller::new(queue, ScriptedClient::new(&[]), config(2, 10));

    poller.cycle().unwrap();
    {
        // Llegan filas nuevas entre ciclos; las viejas no se ven adelantadas.
        let (queue, _) = poller.parts_mut();
        queue.insert(record(1));
        queue.insert(record(12));
    }
    poller.cycle().unwrap();
    poller.cycle().unwrap();

    let (_, client) = poller.into_parts();
    assert_eq!(client.calls(), vec!["2", "4", "1", "7", "9", "12"]);
}

#[test]
fn empty_queue_is_a_pure_idle_cycle() {
    let queue = InMemoryRelayQueue::new();
    let mut poller = RelayPoller::new(queue, ScriptedClient::new(&[]), config(100, 10));

    let outcome = poller.cycle().unwrap();
    assert!(matches!(outcome, CycleOutcome::Idle));

    let (mut queue, client) = poller.into_parts();
    assert!(client.calls().is_empty(), "no debe llamar al servicio");
    assert_eq!(queue.depth().unwrap(), 0);
}

#[test]
fn poisoned_row_is_quarantined_after_max_attempts() {
    let mut queue = InMemoryRelayQueue::new();
    for id in 1..=3 {
        queue.insert(record(id));
    }
    // La fila 1 encabeza la cola y falla siempre: bloquea el lote hasta que
    // la política de dead-letter la saca del camino.
    let mut poller = RelayPoller::new(queue, ScriptedClient::new(&[1]), config(100, 2));

    let first = poller.cycle().unwrap();
    assert!(matches!(first,
                     CycleOutcome::Aborted { failed_id: 1, attempts: 1, quarantined: false }));

    let second = poller.cycle().unwrap();
    assert!(matches!(second,
                     CycleOutcome::Aborted { failed_id: 1, attempts: 2, quarantined: true }));

    // Con la fila envenenada fuera, el resto del lote fluye.
    let third = poller.cycle().unwrap();
    assert!(matches!(third, CycleOutcome::Committed { delivered: 2 }));

    let (mut queue, _) = poller.into_parts();
    assert_eq!(queue.depth().unwrap(), 0);
    assert_eq!(queue.dead_letters().len(), 1);
    assert_eq!(queue.dead_letters()[0].record.id, 1);
    assert_eq!(queue.dead_letters()[0].attempts, 2);
}

#[test]
fn run_loop_stops_promptly_on_shutdown() {
    let mut queue = InMemoryRelayQueue::new();
    queue.insert(record(1));
    // Idle largo: el shutdown debe despertar la espera, no agotarla.
    let cfg = PollerConfig { batch_size: 10,
                             poll_interval: Duration::from_secs(3600),
                             retry_backoff: Duration::from_secs(3600),
                             max_attempts: 10 };
    let mut poller = RelayPoller::new(queue, ScriptedClient::new(&[]), cfg);
    let shutdown = ShutdownToken::new();
    let signaller = shutdown.clone();

    let handle = std::thread::spawn(move || {
        poller.run(&shutdown);
        poller
    });
    std::thread::sleep(Duration::from_millis(50));
    signaller.shutdown();

    let started = std::time::Instant::now();
    let poller = handle.join().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5), "el loop no respetó el shutdown");

    let (mut queue, _) = poller.into_parts();
    // El lote en vuelo terminó limpio antes de salir.
    assert_eq!(queue.depth().unwrap(), 0);
}
