//! Diagnostic logging sink for worker panics (§6 "implementations SHOULD
//! allow installing a custom sink").

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

/// Receives one notification per caught worker panic, in the wire format
/// documented by §6: `Goroutine {id} panic: {detail}`.
pub trait PanicSink: Send + Sync {
    fn on_panic(&self, id: &str, detail: &str);
}

/// Default sink: logs through `tracing` under the `goroutine` target.
pub struct TracingPanicSink;

impl PanicSink for TracingPanicSink {
    fn on_panic(&self, id: &str, detail: &str) {
        tracing::error!(target: "goroutine", task_id = %id, panic = %detail, "Goroutine {id} panic: {detail}");
    }
}

/// Swappable handle to the installed sink.
pub struct PanicSinkHandle {
    inner: RwLock<Arc<dyn PanicSink>>,
}

impl PanicSinkHandle {
    pub fn new() -> Self {
        PanicSinkHandle {
            inner: RwLock::new(Arc::new(TracingPanicSink)),
        }
    }

    pub fn install(&self, sink: Arc<dyn PanicSink>) {
        *self.inner.write() = sink;
    }

    pub fn notify(&self, id: &str, detail: &str) {
        self.inner.read().on_panic(id, detail);
    }
}

impl Default for PanicSinkHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide sink used by `spawn`/`pool`/`pipeline` worker threads.
///
/// Swappable via [`PanicSinkHandle::install`] — install a custom sink once at
/// startup through `crate::runtime::set_panic_sink`.
pub fn global() -> &'static PanicSinkHandle {
    static GLOBAL: OnceLock<PanicSinkHandle> = OnceLock::new();
    GLOBAL.get_or_init(PanicSinkHandle::new)
}

/// Extract a human-readable message out of a `catch_unwind` payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
