//! Synchronization primitives exposed to scripts (§4.4): `Mutex`, `RwMutex`,
//! `Semaphore`, `AtomicInt`, `Once`, `Cond`.

mod atomic;
mod cond;
mod mutex;
mod once;
mod rwmutex;
mod semaphore;

pub use atomic::AtomicInt;
pub use cond::Cond;
pub use mutex::Mutex;
pub use once::Once;
pub use rwmutex::RwMutex;
pub use semaphore::Semaphore;
