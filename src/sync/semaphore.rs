//! `Semaphore` — counting semaphore with `acquire`/`release`/`try_acquire`
//! (§4.4). Capacity-1 is equivalent to [`super::Mutex`] (§8 boundary case).

use parking_lot::{Condvar, Mutex};

pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
    capacity: usize,
}

impl Semaphore {
    /// Preloaded with `capacity` tokens at construction.
    pub fn new(capacity: usize) -> Self {
        Semaphore {
            state: Mutex::new(capacity),
            cond: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        *self.state.lock()
    }

    /// Blocks until a token is available.
    pub fn acquire(&self) {
        let mut tokens = self.state.lock();
        while *tokens == 0 {
            self.cond.wait(&mut tokens);
        }
        *tokens -= 1;
    }

    pub fn try_acquire(&self) -> bool {
        let mut tokens = self.state.lock();
        if *tokens == 0 {
            false
        } else {
            *tokens -= 1;
            true
        }
    }

    /// Returns a token. Panics if that would exceed `capacity` (§3), since
    /// that can only happen if a caller released a token it never
    /// acquired.
    pub fn release(&self) {
        let mut tokens = self.state.lock();
        if *tokens >= self.capacity {
            panic!("semaphore released beyond capacity {}", self.capacity);
        }
        *tokens += 1;
        self.cond.notify_one();
    }
}
