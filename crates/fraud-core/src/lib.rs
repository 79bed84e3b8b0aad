//! fraud-core: motor de relay agnóstico del backend.
//!
//! Define los contratos del pipeline (cola de relay transaccional, cliente
//! de scoring), la máquina de estados del poller
//! (`IDLE -> CLAIMING -> PROCESSING -> (COMMIT | ABORT) -> IDLE`) y una
//! implementación en memoria de la cola con paridad semántica 1:1 respecto
//! al backend Postgres, usada por los tests.

pub mod client;
pub mod errors;
pub mod poller;
pub mod queue;
pub mod shutdown;

pub use client::{ScoringAck, ScoringClient};
pub use errors::{classify, ErrorClass, RelayError};
pub use poller::{CycleOutcome, PollerConfig, RelayPoller};
pub use queue::{BatchOutcome, DeadLetterEntry, InMemoryRelayQueue, RelayQueue};
pub use shutdown::ShutdownToken;
