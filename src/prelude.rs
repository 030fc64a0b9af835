//! Convenience re-exports for consumers that want the common surface in
//! one `use` statement, mirroring the teacher crate's own `prelude`.

pub use crate::async_task::{await_all, await_handle, spawn_async, AsyncHandle, AwaitRecord};
pub use crate::channel::{Channel, Direction};
pub use crate::context::Context;
pub use crate::dataflow::{fan_in, fan_out, pipeline, Stage};
pub use crate::diagnostics::{PanicSink, TracingPanicSink};
pub use crate::error::{CoreError, CoreResult};
pub use crate::pool::{Pool, PoolStats};
pub use crate::runtime::{Runtime, RuntimeConfig};
pub use crate::select::{select, select_timeout, SelectOp};
pub use crate::sync::{AtomicInt, Cond, Mutex, Once, RwMutex, Semaphore};
pub use crate::task::{sleep, spawn, spawn_many, timeout, TaskResult};
pub use crate::value::{Callable, CallableHandle, EngineId, OpaqueHandle, Value};
