//! `RwMutex` — reader/writer lock with writer-priority starvation policy
//! (§4.4: "a pending writer blocks new readers").

use parking_lot::{Condvar, Mutex};

struct State {
    readers: u32,
    writer: bool,
    pending_writers: u32,
}

pub struct RwMutex {
    state: Mutex<State>,
    cond: Condvar,
}

impl RwMutex {
    pub fn new() -> Self {
        RwMutex {
            state: Mutex::new(State {
                readers: 0,
                writer: false,
                pending_writers: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Exclusive lock, writer-priority: once a writer is waiting, no new
    /// reader is admitted ahead of it.
    pub fn lock(&self) {
        let mut state = self.state.lock();
        state.pending_writers += 1;
        while state.writer || state.readers > 0 {
            self.cond.wait(&mut state);
        }
        state.pending_writers -= 1;
        state.writer = true;
    }

    pub fn try_lock(&self) -> bool {
        let mut state = self.state.lock();
        if state.writer || state.readers > 0 {
            false
        } else {
            state.writer = true;
            true
        }
    }

    pub fn unlock(&self) {
        let mut state = self.state.lock();
        state.writer = false;
        self.cond.notify_all();
    }

    /// Shared lock. Blocks while a writer holds the lock or one is pending
    /// (writer-priority).
    pub fn rlock(&self) {
        let mut state = self.state.lock();
        while state.writer || state.pending_writers > 0 {
            self.cond.wait(&mut state);
        }
        state.readers += 1;
    }

    pub fn try_rlock(&self) -> bool {
        let mut state = self.state.lock();
        if state.writer || state.pending_writers > 0 {
            false
        } else {
            state.readers += 1;
            true
        }
    }

    pub fn runlock(&self) {
        let mut state = self.state.lock();
        state.readers = state.readers.saturating_sub(1);
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }
}

impl Default for RwMutex {
    fn default() -> Self {
        Self::new()
    }
}
