//! Shutdown signal
//!
//! One cancellation signal drives every consumption loop, view and the HTTP
//! server. Loops check it between records so an in-flight record always
//! finishes its changelog write and offset commit before the loop exits.

use std::sync::Arc;

use tokio::sync::watch;

/// Fires the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes the shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal fires. A dropped trigger counts as fired.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// A signal that fires when `self` fires or when the returned trigger
    /// is used, whichever comes first. Must be called inside a runtime.
    pub fn child(&self) -> (ShutdownTrigger, Shutdown) {
        let (trigger, child) = channel();
        let forward = trigger.clone();
        let mut parent = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = parent.wait() => forward.trigger(),
                _ = forward.tx.closed() => {}
            }
        });

        (trigger, child)
    }
}
