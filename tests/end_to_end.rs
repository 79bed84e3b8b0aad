//! Escenario de punta a punta sobre el backend en memoria y un contexto de
//! scoring real (sin red): insert capturado -> lote reclamado -> scoring
//! acepta con Predicted_Class=0 -> commit -> la cola queda vacía.

use fraud_core::{CycleOutcome, InMemoryRelayQueue, PollerConfig, RelayError, RelayPoller,
                 RelayQueue, ScoringAck, ScoringClient};
use fraud_domain::{scaled_columns, ScoringRequest, TransactionRecord};
use fraud_scoring::{ColumnRange, ModelArtifact, ScalerParams, ScoringContext};

/// Servicio en proceso: misma lógica de preprocesado e inferencia que el
/// endpoint HTTP, sin pasar por la red.
struct InProcessScoringClient {
    context: ScoringContext,
}

impl ScoringClient for InProcessScoringClient {
    fn score(&self, request: &ScoringRequest) -> Result<ScoringAck, RelayError> {
        match self.context.score(request) {
            Ok(predicted) => Ok(ScoringAck { predicted_class: Some(predicted) }),
            Err(e) => Err(RelayError::ServiceRejected { status: 500, body: e.to_string() }),
        }
    }
}

/// Artefacto mínimo con las 29 columnas reales y un intercepto negativo:
/// toda transacción con features nulas cae en la clase 0.
fn demo_context() -> ScoringContext {
    let feature_order: Vec<String> = scaled_columns().map(str::to_string).collect();
    let columns = feature_order.iter()
                               .map(|name| {
                                   (name.clone(), ColumnRange { min: -200.0, max: 200.0 })
                               })
                               .collect();
    let artifact = ModelArtifact { coefficients: vec![0.0; feature_order.len()],
                                   feature_order,
                                   intercept: -1.0,
                                   scaler: ScalerParams { low: -120.0, high: 120.0, columns } };
    ScoringContext::new(artifact).expect("artefacto válido")
}

#[test]
fn insert_is_captured_scored_and_committed() {
    let record = TransactionRecord { id: 1,
                                     time_stamp: 1_700_000_000.0,
                                     features: [0.0; 28],
                                     amount: 49.99,
                                     class: Some(0) };

    let context = demo_context();
    // El servicio clasifica este registro como legítimo.
    assert_eq!(context.score(&record.to_scoring_request()).unwrap(), 0);

    // Captura: el insert primario deja exactamente una entrada en la cola.
    let mut queue = InMemoryRelayQueue::new();
    queue.insert(record);
    assert_eq!(queue.primary_records().len(), 1);
    assert_eq!(queue.queued_ids(), vec![1]);

    // Un ciclo del poller: reclama, entrega, confirma.
    let client = InProcessScoringClient { context };
    let mut poller = RelayPoller::new(queue, client, PollerConfig::default());
    let outcome = poller.cycle().expect("ciclo sin fallo de backend");
    assert!(matches!(outcome, CycleOutcome::Committed { delivered: 1 }));

    let (mut queue, _) = poller.into_parts();
    assert_eq!(queue.depth().unwrap(), 0, "la cola ya no contiene id=1");
    assert!(queue.queued_ids().is_empty());
    // El almacén primario conserva el registro: el relay sólo borra su copia.
    assert_eq!(queue.primary_records().len(), 1);
}

#[test]
fn second_cycle_after_empty_queue_does_nothing() {
    let context = demo_context();
    let client = InProcessScoringClient { context };
    let mut poller = RelayPoller::new(InMemoryRelayQueue::new(), client, PollerConfig::default());
    assert!(matches!(poller.cycle().unwrap(), CycleOutcome::Idle));
}
