//! Named worker pools (§4.8 Worker Pool).
//!
//! The submission queue is a small bounded FIFO built the same way as
//! [`crate::channel::Channel`] (`parking_lot::{Mutex, Condvar}`) but typed
//! over [`Task`] directly rather than [`crate::value::Value`] — pool tasks
//! carry a boxed closure and a result sink, neither of which belongs on the
//! script/native value boundary.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::context::Context;
use crate::diagnostics::{self, panic_message};
use crate::error::CoreError;
use crate::task::TaskResult;
use crate::value::Value;

type TaskFn = Box<dyn FnOnce(&[Value]) -> Result<Vec<Value>, CoreError> + Send>;

struct Task {
    id: String,
    body: TaskFn,
    args: Vec<Value>,
    sink: mpsc::Sender<TaskResult>,
}

struct TaskQueue {
    buffer: Mutex<VecDeque<Task>>,
    cond: Condvar,
    capacity: usize,
    closed: std::sync::atomic::AtomicBool,
}

impl TaskQueue {
    fn new(capacity: usize) -> Self {
        TaskQueue {
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            cond: Condvar::new(),
            capacity,
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn try_push(&self, task: Task) -> Result<(), Task> {
        let mut buf = self.buffer.lock();
        if self.closed.load(Ordering::SeqCst) || buf.len() >= self.capacity {
            return Err(task);
        }
        buf.push_back(task);
        self.cond.notify_all();
        Ok(())
    }

    fn pop(&self) -> Option<Task> {
        let mut buf = self.buffer.lock();
        loop {
            if let Some(t) = buf.pop_front() {
                self.cond.notify_all();
                return Some(t);
            }
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.cond.wait(&mut buf);
        }
    }

    fn close(&self) {
        let _buf = self.buffer.lock();
        self.closed.store(true, Ordering::SeqCst);
        self.cond.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Snapshot returned by [`Pool::stats`].
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub name: String,
    pub workers: usize,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub queued: usize,
}

/// A named, fixed-size worker pool.
pub struct Pool {
    name: String,
    workers: usize,
    queue: Arc<TaskQueue>,
    active: Arc<AtomicI64>,
    completed: Arc<AtomicI64>,
    failed: Arc<AtomicI64>,
    ctx: Context,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// `pool_create(name, {workers})`. `workers` must be ≥ 1. The queue's
    /// internal capacity is `2 * workers` (§4.8).
    pub fn create(name: impl Into<String>, workers: usize, parent: &Context) -> Result<Arc<Pool>, CoreError> {
        if workers < 1 {
            return Err(CoreError::invalid_argument("pool workers must be >= 1"));
        }
        let name = name.into();
        let queue = Arc::new(TaskQueue::new(workers * 2));
        let active = Arc::new(AtomicI64::new(0));
        let completed = Arc::new(AtomicI64::new(0));
        let failed = Arc::new(AtomicI64::new(0));
        let (ctx, _cancel) = parent.with_cancel();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let active = Arc::clone(&active);
            let completed = Arc::clone(&completed);
            let failed = Arc::clone(&failed);
            let worker_ctx = ctx.clone();
            handles.push(thread::spawn(move || {
                worker_loop(queue, active, completed, failed, worker_ctx)
            }));
        }

        Ok(Arc::new(Pool {
            name,
            workers,
            queue,
            active,
            completed,
            failed,
            ctx,
            worker_handles: Mutex::new(handles),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `pool_submit(name, fn, args...)` — non-blocking.
    pub fn submit<F>(&self, body: F, args: Vec<Value>) -> Result<String, CoreError>
    where
        F: FnOnce(&[Value]) -> Result<Vec<Value>, CoreError> + Send + 'static,
    {
        if self.ctx.is_cancelled() || self.queue.is_closed() {
            return Err(CoreError::closed("pool closed"));
        }
        let id = format!("{}-{}", self.name, crate::context::monotonic_nanos());
        let (tx, _rx) = mpsc::channel();
        let task = Task {
            id: id.clone(),
            body: Box::new(body),
            args,
            sink: tx,
        };
        self.queue
            .try_push(task)
            .map(|_| id)
            .map_err(|_| CoreError::full("pool queue saturated"))
    }

    /// `pool_wait(name)` — closes submissions and blocks until every
    /// accepted task has finished.
    pub fn wait(&self) {
        self.queue.close();
        let mut handles = self.worker_handles.lock();
        for h in handles.drain(..) {
            let _ = h.join();
        }
    }

    /// `pool_close(name)` — cancels the pool's context, closes the queue,
    /// waits for workers to exit.
    pub fn close(&self) {
        self.ctx.cancel();
        self.wait();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            name: self.name.clone(),
            workers: self.workers,
            active: self.active.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            queued: self.queue.buffer.lock().len(),
        }
    }
}

fn worker_loop(
    queue: Arc<TaskQueue>,
    active: Arc<AtomicI64>,
    completed: Arc<AtomicI64>,
    failed: Arc<AtomicI64>,
    ctx: Context,
) {
    loop {
        if ctx.is_cancelled() {
            return;
        }
        let task = match queue.pop() {
            Some(t) => t,
            None => return,
        };
        active.fetch_add(1, Ordering::SeqCst);
        let Task { id, body, args, sink } = task;
        let result = match std::panic::catch_unwind(AssertUnwindSafe(|| body(&args))) {
            Ok(Ok(values)) => {
                completed.fetch_add(1, Ordering::SeqCst);
                TaskResult {
                    success: true,
                    values,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                failed.fetch_add(1, Ordering::SeqCst);
                TaskResult {
                    success: false,
                    values: vec![],
                    error: Some(e.to_string()),
                }
            }
            Err(payload) => {
                let detail = panic_message(&*payload);
                diagnostics::global().notify(&id, &detail);
                failed.fetch_add(1, Ordering::SeqCst);
                TaskResult {
                    success: false,
                    values: vec![],
                    error: Some(detail),
                }
            }
        };
        active.fetch_sub(1, Ordering::SeqCst);
        let _ = sink.send(result);
    }
}
