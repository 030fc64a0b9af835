//! `Once` — one-shot initialization (§4.4).
//!
//! Not built on `std::sync::Once`: that type poisons on a panicking
//! closure, after which every later `call_once` panics too. §8 invariant 4
//! requires the opposite — "if any fnᵢ panics, subsequent calls still
//! return immediately (documented: the panic is logged)" — so this wraps
//! the run in `catch_unwind` and always marks itself done afterwards.

use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    NotStarted,
    Done,
}

pub struct Once {
    state: Mutex<State>,
}

impl Once {
    pub fn new() -> Self {
        Once {
            state: Mutex::new(State::NotStarted),
        }
    }

    pub fn has_fired(&self) -> bool {
        *self.state.lock() == State::Done
    }

    /// Runs `f` exactly once across every caller. The first caller blocks
    /// until `f` returns (or panics); concurrent callers block on the same
    /// internal lock; later callers return immediately without running
    /// `f`.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce(),
    {
        let mut state = self.state.lock();
        if *state == State::Done {
            return;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(f));
        *state = State::Done;
        if let Err(payload) = result {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(target: "goroutine", panic = %detail, "Once closure panicked");
        }
    }
}

impl Default for Once {
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
    fn runs_exactly_once_under_concurrency() {
        let once = Arc::new(Once::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let once = Arc::clone(&once);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    once.call(|| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(once.has_fired());
    }

    #[test]
    fn later_calls_return_without_running_after_a_panic() {
        let once = Once::new();
        let ran = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            once.call(|| panic!("boom"));
        }));
        assert!(ran.is_ok(), "Once::call must itself not propagate the panic");
        assert!(once.has_fired());

        let second_ran = std::sync::atomic::AtomicBool::new(false);
        once.call(|| second_ran.store(true, Ordering::SeqCst));
        assert!(!second_ran.load(Ordering::SeqCst));
    }
}
