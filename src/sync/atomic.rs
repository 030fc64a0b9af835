//! `AtomicInt` — 64-bit signed atomic integer (§4.4).

use std::sync::atomic::{AtomicI64, Ordering};

pub struct AtomicInt {
    value: AtomicI64,
}

impl AtomicInt {
    pub fn new(initial: i64) -> Self {
        AtomicInt {
            value: AtomicI64::new(initial),
        }
    }

    pub fn load(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn store(&self, v: i64) {
        self.value.store(v, Ordering::SeqCst);
    }

    /// Returns the new value.
    pub fn add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Returns the previous value.
    pub fn swap(&self, v: i64) -> i64 {
        self.value.swap(v, Ordering::SeqCst)
    }

    pub fn compare_and_swap(&self, old: i64, new: i64) -> bool {
        self.value
            .compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for AtomicInt {
    fn default() -> Self {
        Self::new(0)
    }
}
