//! `spawn`/`spawn_many`/`sleep`/`timeout` (§4.6 Task Spawner).
//!
//! Every entry point here is fire-and-forget from the native side: panics
//! are caught, logged through [`crate::diagnostics::global`], and never
//! propagated to the spawning thread. None of these accept a `Context` —
//! per §5, bare `spawn`/`timeout` cannot be cancelled externally; callers
//! who need cancellation share a `Context` through their closure's captures.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::diagnostics::{self, panic_message};
use crate::engine::{EngineFactory, NullEngineFactory};
use crate::value::Value;

/// Outcome of a single task invocation (§3 `TaskResult`).
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub success: bool,
    pub values: Vec<Value>,
    pub error: Option<String>,
}

impl TaskResult {
    fn ok(values: Vec<Value>) -> Self {
        TaskResult {
            success: true,
            values,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        TaskResult {
            success: false,
            values: Vec::new(),
            error: Some(message.into()),
        }
    }
}

fn run_guarded<F>(task_id: &str, body: F) -> TaskResult
where
    F: FnOnce() -> Result<Vec<Value>, crate::error::CoreError> + panic::UnwindSafe,
{
    match panic::catch_unwind(body) {
        Ok(Ok(values)) => TaskResult::ok(values),
        Ok(Err(e)) => TaskResult::err(e.to_string()),
        Err(payload) => {
            let detail = panic_message(&*payload);
            diagnostics::global().notify(task_id, &detail);
            TaskResult::err(detail)
        }
    }
}

/// A function invoked by the task machinery with a fresh
/// [`crate::engine::ScriptEngine`] already acquired for it.
///
/// A real embedding supplies a closure that hands the engine to a
/// `CallableHandle::invoke_for_task`; plain Rust callers can ignore the
/// engine argument entirely.
pub trait TaskBody: Send + 'static {
    fn run(self: Box<Self>, args: &[Value]) -> Result<Vec<Value>, crate::error::CoreError>;
}

impl<F> TaskBody for F
where
    F: FnOnce(&[Value]) -> Result<Vec<Value>, crate::error::CoreError> + Send + 'static,
{
    fn run(self: Box<Self>, args: &[Value]) -> Result<Vec<Value>, crate::error::CoreError> {
        (*self)(args)
    }
}

fn acquire_and_release<R>(f: impl FnOnce() -> R) -> R {
    let factory = NullEngineFactory;
    let engine = factory.acquire();
    let result = f();
    factory.release(engine);
    result
}

/// `spawn(fn)` — runs on a new native thread with a fresh engine;
/// fire-and-forget, result discarded after logging any panic.
pub fn spawn<F>(task_id: impl Into<String>, body: F) -> thread::JoinHandle<TaskResult>
where
    F: TaskBody,
{
    let id = task_id.into();
    thread::spawn(move || {
        acquire_and_release(|| {
            run_guarded(&id, AssertUnwindSafe(move || body.run(&[])))
        })
    })
}

/// `spawn_many(n, fn)` — spawns `n` threads, each given its 1-based index
/// as the sole argument.
pub fn spawn_many<F>(
    task_id_prefix: impl Into<String>,
    n: usize,
    make_body: impl Fn(usize) -> F,
) -> Vec<thread::JoinHandle<TaskResult>>
where
    F: TaskBody,
{
    let prefix = task_id_prefix.into();
    (1..=n)
        .map(|i| {
            let id = format!("{prefix}-{i}");
            let body = make_body(i);
            thread::spawn(move || {
                acquire_and_release(|| {
                    run_guarded(&id, AssertUnwindSafe(move || {
                        body.run(&[Value::Number(i as f64)])
                    }))
                })
            })
        })
        .collect()
}

/// `sleep(ms)` — blocks the calling thread for at least `ms` milliseconds.
pub fn sleep(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// `timeout(ms, fn)` — runs `fn` on a new thread. Returns `Ok(values)` if it
/// finishes within `ms`, `Err("timeout exceeded")` otherwise. The worker is
/// never forcibly killed; it keeps running to completion in the background
/// and its eventual result (or panic) is simply discarded (§4.6 documented
/// limitation).
pub fn timeout<F>(task_id: impl Into<String>, ms: u64, body: F) -> Result<Vec<Value>, String>
where
    F: TaskBody,
{
    let id = task_id.into();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = acquire_and_release(|| {
            run_guarded(&id, AssertUnwindSafe(move || body.run(&[])))
        });
        let _ = tx.send(result);
    });

    match rx.recv_timeout(Duration::from_millis(ms)) {
        Ok(result) if result.success => Ok(result.values),
        Ok(result) => Err(result.error.unwrap_or_else(|| "task failed".to_string())),
        Err(_) => Err("timeout exceeded".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn spawn_runs_fn_and_reports_success() {
        let handle = spawn("t-1", |_args: &[Value]| Ok(vec![Value::Number(42.0)]));
        let result = handle.join().unwrap();
        assert!(result.success);
        assert!(matches!(result.values[0], Value::Number(n) if n == 42.0));
    }

    #[test]
    fn spawn_catches_panics_and_reports_failure() {
        let handle = spawn("t-2", |_args: &[Value]| -> Result<Vec<Value>, crate::error::CoreError> {
            panic!("boom");
        });
        let result = handle.join().unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[test]
    fn spawn_many_passes_one_based_index() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let handles = spawn_many("many", 3, |_i| {
            let seen = Arc::clone(&seen);
            move |args: &[Value]| {
                if let Value::Number(n) = args[0] {
                    seen.lock().unwrap().push(n as i64);
                }
                Ok(vec![])
            }
        });
        for h in handles {
            h.join().unwrap();
        }
        let mut got = seen.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn sleep_blocks_for_at_least_requested_duration() {
        let start = std::time::Instant::now();
        sleep(30);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn timeout_returns_values_when_fast_enough() {
        let result = timeout("to-1", 200, |_args: &[Value]| Ok(vec![Value::Bool(true)]));
        assert!(result.is_ok());
    }

    #[test]
    fn timeout_reports_timeout_exceeded_when_too_slow() {
        let result = timeout("to-2", 30, |_args: &[Value]| {
            thread::sleep(Duration::from_millis(200));
            Ok(vec![])
        });
        assert_eq!(result.unwrap_err(), "timeout exceeded");
    }

    #[test]
    fn timeout_worker_panic_counted_separately_from_timeout() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let result = timeout("to-3", 200, move |_args: &[Value]| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });
        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
