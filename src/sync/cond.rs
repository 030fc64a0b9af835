//! `Cond` — condition variable paired with a [`Mutex`] (§4.4).

use std::sync::Arc;

use parking_lot::Condvar;

use super::mutex::Mutex;

/// Must be used with its paired mutex held: `wait` atomically releases it
/// and blocks, re-acquiring before returning; `signal`/`broadcast` wake
/// one/all waiters.
pub struct Cond {
    mutex: Arc<Mutex>,
    waiters: Condvar,
}

impl Cond {
    pub fn new(mutex: Arc<Mutex>) -> Self {
        Cond {
            mutex,
            waiters: Condvar::new(),
        }
    }

    /// Returns the paired mutex (`get_mutex` in §4.4).
    pub fn get_mutex(&self) -> Arc<Mutex> {
        Arc::clone(&self.mutex)
    }

    /// Atomically release the paired mutex and block; re-acquire before
    /// returning. Caller must already hold the mutex.
    pub fn wait(&self) {
        let mut locked = self.mutex.state.lock();
        *locked = false;
        self.mutex.cond.notify_one();
        self.waiters.wait(&mut locked);
        drop(locked);
        self.mutex.lock();
    }

    /// Wake one waiter.
    pub fn signal(&self) {
        self.waiters.notify_one();
    }

    /// Wake every waiter.
    pub fn broadcast(&self) {
        self.waiters.notify_all();
    }
}
