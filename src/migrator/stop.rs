//! Graceful stop
//!
//! A single-slot signal. Once observed it stays latched for the lifetime of
//! the migrator.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{bounded, Receiver, Sender};

pub(crate) struct StopSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
    latched: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            tx,
            rx,
            latched: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> StopHandle {
        StopHandle { tx: self.tx.clone() }
    }

    /// Non-blocking check
    pub fn should_stop(&self) -> bool {
        if self.latched.load(Ordering::SeqCst) {
            return true;
        }
        if self.rx.try_recv().is_ok() {
            tracing::info!("graceful stop requested");
            self.latched.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }
}

/// Requests that no further migration starts after the current one
///
/// Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        // The slot holds one request; more are redundant
        let _ = self.tx.try_send(());
    }
}
