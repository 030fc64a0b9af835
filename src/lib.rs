//! Concurrency primitives exposed to an embedded scripting layer:
//! spawnable tasks, worker pools, typed channels with select, mutexes,
//! semaphores, atomics, cancellation contexts, and dataflow composers.
//!
//! The embedding script runtime itself — parser, VM, value representation —
//! is out of scope. This crate only consumes a [`value::Value`] bridge, a
//! [`engine::ScriptEngine`] seam, and a [`value::Callable`] reference; it
//! never executes script source directly.
//!
//! Every suspension point in this crate is a native OS thread blocking on
//! `parking_lot` primitives — there is no async executor here. A work unit
//! (task, pool task, pipeline stage worker) owns a private [`engine::ScriptEngine`]
//! for its entire lifetime; the script code within one engine is assumed
//! cooperative and single-threaded, never shared across threads.

pub mod async_task;
pub mod channel;
pub mod context;
pub mod dataflow;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod runtime;
pub mod select;
pub mod sync;
pub mod task;
pub mod value;
