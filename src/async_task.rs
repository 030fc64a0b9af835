//! `async`/`await`/`await_all` (§4.7 Async/Await).
//!
//! `AsyncHandle` memoizes its result the first time any caller blocks on
//! it; every later `await` returns the memoized value without touching the
//! worker thread again — mirrors §3's "only the first blocks, later calls
//! return the memoized result."

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::task::TaskBody;
use crate::value::Value;

#[derive(Debug, Clone)]
enum Outcome {
    Success(Vec<Value>),
    Failure(String),
}

struct Shared {
    join: Mutex<Option<thread::JoinHandle<Outcome>>>,
    memoized: Mutex<Option<Outcome>>,
}

/// Handle to an in-flight or completed asynchronous computation.
#[derive(Clone)]
pub struct AsyncHandle {
    id: String,
    shared: Arc<Shared>,
}

impl AsyncHandle {
    fn resolve(&self) -> Outcome {
        let mut memo = self.shared.memoized.lock().unwrap();
        if let Some(outcome) = memo.as_ref() {
            return outcome.clone();
        }
        let handle = self.shared.join.lock().unwrap().take();
        let outcome = match handle {
            Some(h) => h.join().unwrap_or_else(|payload| {
                let detail = crate::diagnostics::panic_message(&*payload);
                crate::diagnostics::global().notify(&self.id, &detail);
                Outcome::Failure(detail)
            }),
            // Another caller already took the join handle and is mid-resolve;
            // this only happens if memoized hasn't been set yet, which can't
            // race past this lock since both paths hold `memoized`.
            None => Outcome::Failure("async handle already consumed".to_string()),
        };
        *memo = Some(outcome.clone());
        outcome
    }
}

/// `async(fn)` — starts `fn` on a new thread and returns a handle.
pub fn spawn_async<F>(task_id: impl Into<String>, body: F) -> AsyncHandle
where
    F: TaskBody,
{
    let id = task_id.into();
    let thread_id = id.clone();
    let join = thread::spawn(move || {
        match std::panic::catch_unwind(AssertUnwindSafe(move || body.run(&[]))) {
            Ok(Ok(values)) => Outcome::Success(values),
            Ok(Err(e)) => Outcome::Failure(e.to_string()),
            Err(payload) => {
                let detail = crate::diagnostics::panic_message(&*payload);
                crate::diagnostics::global().notify(&thread_id, &detail);
                Outcome::Failure(detail)
            }
        }
    });
    AsyncHandle {
        id,
        shared: Arc::new(Shared {
            join: Mutex::new(Some(join)),
            memoized: Mutex::new(None),
        }),
    }
}

/// `await(h)` — blocks until `h`'s worker completes (or returns immediately
/// with the memoized result if it already has).
pub fn await_handle(handle: &AsyncHandle) -> Result<Vec<Value>, String> {
    match handle.resolve() {
        Outcome::Success(values) => Ok(values),
        Outcome::Failure(message) => Err(message),
    }
}

/// One entry of [`await_all`]'s result, preserving input order.
#[derive(Debug, Clone)]
pub struct AwaitRecord {
    pub success: bool,
    pub values: Vec<Value>,
    pub error: Option<String>,
}

/// `await_all(list)` — awaits every handle, returning records in the same
/// order as the input list (not completion order).
pub fn await_all(handles: &[AsyncHandle]) -> Vec<AwaitRecord> {
    handles
        .iter()
        .map(|h| match h.resolve() {
            Outcome::Success(values) => AwaitRecord {
                success: true,
                values,
                error: None,
            },
            Outcome::Failure(message) => AwaitRecord {
                success: false,
                values: Vec::new(),
                error: Some(message),
            },
        })
        .collect()
}
