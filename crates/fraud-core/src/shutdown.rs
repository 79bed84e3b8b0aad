//! Señal de apagado para el loop bloqueante del poller.
//!
//! Equivalente síncrono del token de cancelación de los pipelines async:
//! un flag compartido más un condvar para que las esperas de idle/backoff
//! despierten en cuanto se pide el apagado en vez de agotar el intervalo.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    requested: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pide el apagado y despierta todas las esperas en curso.
    pub fn shutdown(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Espera hasta `timeout` o hasta que se pida el apagado, lo que ocurra
    /// primero. Devuelve `true` si el apagado fue pedido.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }
        let guard = match self.inner.lock.lock() {
            Ok(g) => g,
            // Un lock envenenado sólo puede venir de un panic ajeno; tratamos
            // la espera como cancelada para que el loop termine ordenado.
            Err(_) => return true,
        };
        let (_guard, _result) = match self.inner
                                          .condvar
                                          .wait_timeout_while(guard, timeout, |_| !self.is_shutdown())
        {
            Ok(pair) => pair,
            Err(_) => return true,
        };
        self.is_shutdown()
    }
}
