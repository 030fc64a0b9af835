//! Module-scope lifecycle registry (§4.11 Module Lifecycle).
//!
//! Mirrors the teacher's "inject a `CoreRuntime` object that the script
//! binding acquires once at startup; all primitives are methods on it"
//! design note (§9): this crate has no process-wide global beyond the
//! panic sink singleton in [`crate::diagnostics`] — callers construct one
//! `Runtime` and hand it to every primitive constructor that needs the
//! global cancellation root or wants its pools/channels tracked for
//! `cleanup()`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::channel::Channel;
use crate::context::Context;
use crate::diagnostics::{self, PanicSink};
use crate::error::CoreError;
use crate::pool::Pool;

/// Runtime-level tuning, deliberately narrow (§2 A3): this is not the host
/// application's general configuration system, only the handful of knobs
/// this crate's own constructors need a default for.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub default_pool_workers: usize,
    pub max_channel_capacity: usize,
    pub dataflow_stage_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            default_pool_workers: 4,
            max_channel_capacity: crate::channel::MAX_CAPACITY,
            dataflow_stage_capacity: 10,
        }
    }
}

struct Registry {
    pools: RwLock<std::collections::HashMap<String, Arc<Pool>>>,
    channels: RwLock<Vec<Channel>>,
}

/// The process/module-wide handle a script binding acquires once at
/// startup. Owns the global cancellation root and the registry of named
/// pools and tracked channels that `cleanup()` tears down.
pub struct Runtime {
    pub config: RuntimeConfig,
    global_ctx: Context,
    registry: Registry,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Arc<Runtime> {
        Arc::new(Runtime {
            config,
            global_ctx: Context::root(),
            registry: Registry {
                pools: RwLock::new(std::collections::HashMap::new()),
                channels: RwLock::new(Vec::new()),
            },
        })
    }

    /// `context()` — a fresh cancellable root whose parent is this
    /// runtime's global context.
    pub fn context(&self) -> Context {
        self.global_ctx.with_cancel().0
    }

    pub fn global_context(&self) -> &Context {
        &self.global_ctx
    }

    /// Install a custom panic sink (§6: "implementations SHOULD allow
    /// installing a custom sink").
    pub fn set_panic_sink(&self, sink: Arc<dyn PanicSink>) {
        diagnostics::global().install(sink);
    }

    /// `pool_create(name, {workers})` — closes and replaces any pool
    /// already registered under `name`.
    pub fn pool_create(&self, name: impl Into<String>, workers: usize) -> Result<Arc<Pool>, CoreError> {
        let name = name.into();
        let pool = Pool::create(name.clone(), workers, &self.global_ctx)?;
        let mut pools = self.registry.pools.write();
        if let Some(old) = pools.insert(name, Arc::clone(&pool)) {
            old.close();
        }
        Ok(pool)
    }

    pub fn pool(&self, name: &str) -> Option<Arc<Pool>> {
        self.registry.pools.read().get(name).cloned()
    }

    /// `pool_close(name)` — `false` if no such pool is registered (the
    /// idempotence law in §8: closing an unknown name is a no-op failure).
    pub fn pool_close(&self, name: &str) -> bool {
        match self.registry.pools.write().remove(name) {
            Some(pool) => {
                pool.close();
                true
            }
            None => false,
        }
    }

    /// Register a channel so `cleanup()` closes it too.
    pub fn track_channel(&self, channel: Channel) {
        self.registry.channels.write().push(channel);
    }

    /// Cancel the global context (propagating to every pool/context
    /// derived from it), close every registered pool, close every tracked
    /// channel, and clear the registry. Errors during cleanup are
    /// suppressed beyond logging (§4.11, §7).
    pub fn cleanup(&self) {
        self.global_ctx.cancel();

        let mut pools = self.registry.pools.write();
        for (_, pool) in pools.drain() {
            pool.close();
        }

        let mut channels = self.registry.channels.write();
        for channel in channels.drain(..) {
            let (_ok, err) = channel.close();
            if let Some(reason) = err {
                tracing::debug!(target: "goroutine", reason, "cleanup: channel already closed");
            }
        }
    }
}
