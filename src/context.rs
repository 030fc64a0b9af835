//! Cancellation and deadline propagation tree (§4.5 `Context`).
//!
//! Mirrors the teacher's `spark_core::contract::Cancellation` node
//! (cancel-token-with-children, compare-and-swap driven, checked with
//! `Ordering::SeqCst` at the boundary so "cancelled" is visible to every
//! descendant no later than the ancestor observes it itself — see
//! `tests/context.rs::cancellation_propagates_to_descendants`).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// Reason a [`Context`] finished, surfaced by [`Context::err`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    Cancelled,
    DeadlineExceeded,
}

impl DoneReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DoneReason::Cancelled => "canceled",
            DoneReason::DeadlineExceeded => "deadline exceeded",
        }
    }
}

struct Inner {
    parent: Option<Context>,
    cancelled: AtomicBool,
    reason: Mutex<Option<DoneReason>>,
    deadline: Option<Instant>,
    deadline_ms: Option<u64>,
    children: Mutex<Vec<Weak<Inner>>>,
}

/// A node in the cancellation/deadline tree.
///
/// `Context` is a cheap `Clone` (it's an `Arc` underneath). Cancelling a
/// node cancels every live descendant; cancelling an already-done node is a
/// documented no-op (`ctx.cancel(); ctx.cancel();` — second call returns
/// `false`, §8 idempotence laws).
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

fn now_ms() -> u64 {
    static EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let epoch = *EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_millis() as u64
}

impl Context {
    /// A fresh cancellable root with no parent and no deadline — the
    /// module's global context, or any other top-level root a host wants.
    pub fn root() -> Self {
        Context {
            inner: Arc::new(Inner {
                parent: None,
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
                deadline: None,
                deadline_ms: None,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    fn child_with_deadline(&self, deadline: Option<Instant>, deadline_ms: Option<u64>) -> Context {
        let child = Context {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                cancelled: AtomicBool::new(self.is_cancelled()),
                reason: Mutex::new(if self.is_cancelled() {
                    Some(DoneReason::Cancelled)
                } else {
                    None
                }),
                deadline,
                deadline_ms,
                children: Mutex::new(Vec::new()),
            }),
        };
        self.inner
            .children
            .lock()
            .unwrap()
            .push(Arc::downgrade(&child.inner));
        child
    }

    /// `with_cancel()` — a child whose own `cancel_fn`, when invoked,
    /// cancels this child and its descendants but never the parent.
    pub fn with_cancel(&self) -> (Context, impl Fn() + Send + Sync + 'static) {
        let child = self.child_with_deadline(None, None);
        let cancel_target = child.clone();
        (child, move || {
            cancel_target.cancel();
        })
    }

    /// `with_timeout(ms)` — child cancels `ms` milliseconds from now.
    pub fn with_timeout(&self, ms: u64) -> Context {
        self.child_with_deadline(Some(Instant::now() + Duration::from_millis(ms)), Some(now_ms() + ms))
    }

    /// `with_deadline(epoch_ms)` — child cancels at the given wall-clock
    /// instant, expressed relative to this crate's internal monotonic
    /// epoch (see [`now_ms`]); the embedding is expected to translate real
    /// wall-clock deadlines into this crate's millisecond clock at the
    /// call site, since the crate itself never touches `SystemTime`.
    pub fn with_deadline(&self, epoch_ms: u64) -> Context {
        let now = now_ms();
        let delta = epoch_ms.saturating_sub(now);
        self.child_with_deadline(Some(Instant::now() + Duration::from_millis(delta)), Some(epoch_ms))
    }

    fn check_own_deadline(&self) -> bool {
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline && !self.inner.cancelled.swap(true, Ordering::SeqCst) {
                *self.inner.reason.lock().unwrap() = Some(DoneReason::DeadlineExceeded);
                self.propagate_to_children();
                return true;
            }
        }
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn propagate_to_children(&self) {
        let children = self.inner.children.lock().unwrap();
        for weak in children.iter() {
            if let Some(inner) = weak.upgrade() {
                let child = Context { inner };
                child.cancel();
            }
        }
    }

    /// Cancel this node. Returns `true` on the first call, `false` on every
    /// call after that (idempotent per §8).
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        {
            let mut reason = self.inner.reason.lock().unwrap();
            if reason.is_none() {
                *reason = Some(DoneReason::Cancelled);
            }
        }
        self.propagate_to_children();
        true
    }

    /// True iff this node or any ancestor is cancelled or its deadline has
    /// elapsed. Checking this also lazily trips this node's own deadline.
    pub fn is_cancelled(&self) -> bool {
        if self.check_own_deadline() {
            return true;
        }
        if let Some(parent) = &self.inner.parent {
            if parent.is_cancelled() {
                self.inner.cancelled.store(true, Ordering::SeqCst);
                let mut reason = self.inner.reason.lock().unwrap();
                if reason.is_none() {
                    *reason = Some(DoneReason::Cancelled);
                }
                return true;
            }
        }
        false
    }

    /// `"canceled"` / `"deadline exceeded"` once done, `None` otherwise.
    pub fn err(&self) -> Option<&'static str> {
        if !self.is_cancelled() {
            return None;
        }
        self.inner
            .reason
            .lock()
            .unwrap()
            .map(DoneReason::as_str)
            .or(Some(DoneReason::Cancelled.as_str()))
    }

    /// `(ms_since_epoch, has_deadline)`.
    pub fn deadline(&self) -> (u64, bool) {
        match self.inner.deadline_ms {
            Some(ms) => (ms, true),
            None => (0, false),
        }
    }
}

/// Monotonically increasing counter exposed for tests/diagnostics that want
/// a lightweight clock without pulling in `SystemTime`; used by the pool
/// module for `{pool}-{monotonic-nanos}` task ids (§4.8).
pub fn monotonic_nanos() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
