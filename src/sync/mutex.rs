//! `Mutex` — exclusive lock with explicit `lock`/`unlock`/`try_lock` (§4.4).
//!
//! Deliberately not RAII-guard-based: a script caller invokes `lock()` and
//! `unlock()` as two separate method calls with arbitrary script code in
//! between, so there is no Rust scope to tie a guard's lifetime to. The
//! "logical" critical section is therefore a plain boolean flag guarded by
//! a `parking_lot::Mutex` that is only ever held for the instant it takes
//! to read or flip that flag — never across the caller's own critical
//! section. [`crate::sync::Cond`] relies on this shape so it can release
//! and atomically re-acquire the same flag.

use parking_lot::{Condvar, Mutex as RawMutex};

/// An exclusive lock. Recursion is not supported (§4.4): the same caller
/// relocking from the same task deadlocks, matching the non-reentrant
/// mutexes this primitive is modeled on.
pub struct Mutex {
    pub(crate) state: RawMutex<bool>,
    pub(crate) cond: Condvar,
}

impl Mutex {
    pub fn new() -> Self {
        Mutex {
            state: RawMutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Blocks until the lock is free, then takes it.
    pub fn lock(&self) {
        let mut locked = self.state.lock();
        while *locked {
            self.cond.wait(&mut locked);
        }
        *locked = true;
    }

    /// Non-blocking variant of [`Mutex::lock`].
    pub fn try_lock(&self) -> bool {
        let mut locked = self.state.lock();
        if *locked {
            false
        } else {
            *locked = true;
            true
        }
    }

    /// Releases the lock, waking one waiter if any are parked.
    pub fn unlock(&self) {
        let mut locked = self.state.lock();
        *locked = false;
        self.cond.notify_one();
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn try_lock_fails_while_held() {
        let m = Mutex::new();
        m.lock();
        assert!(!m.try_lock());
        m.unlock();
        assert!(m.try_lock());
    }

    #[test]
    fn no_two_critical_sections_run_concurrently() {
        let mutex = Arc::new(Mutex::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                let counter = Arc::clone(&counter);
                let overlap = Arc::clone(&overlap);
                thread::spawn(move || {
                    for _ in 0..200 {
                        mutex.lock();
                        let before = counter.fetch_add(1, Ordering::SeqCst);
                        if before != 0 {
                            overlap.fetch_add(1, Ordering::SeqCst);
                        }
                        counter.fetch_sub(1, Ordering::SeqCst);
                        mutex.unlock();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }
}
