//! The universal value that crosses the script/native boundary (§3 `Value`).
//!
//! Only the immutable leaf variants (`Nil`, `Bool`, `Number`, `String`) are
//! safe to hand to a different script engine without copying; `List`/`Map`
//! must be deep-copied on send (see [`Value::deep_copy_for_send`]).
//! `Callable` and `Handle` are reference types — cloning a `Value` never
//! clones their identity, only the reference to it, matching §9's "Handle
//! identity vs value identity" note.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::CoreError;

/// Identity of one `ScriptEngine` instance. Used to detect
/// [`CoreError::CrossEngineInvocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineId(u64);

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

impl EngineId {
    pub fn next() -> Self {
        EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

/// A script-defined function, reachable only from the engine that created it.
///
/// Dispatch is intentionally minimal here: the actual script VM is out of
/// scope (`spec.md` §1). A real binding implements this trait over its own
/// callable representation; [`CallableHandle::call`] enforces the
/// cross-engine check before ever reaching the implementation.
pub trait Callable: Send + Sync {
    fn call(&self, args: &[Value]) -> Result<Vec<Value>, CoreError>;
}

/// Opaque, engine-tagged reference to a [`Callable`].
#[derive(Clone)]
pub struct CallableHandle {
    owner: EngineId,
    inner: Arc<dyn Callable>,
}

impl CallableHandle {
    pub fn new(owner: EngineId, callable: Arc<dyn Callable>) -> Self {
        CallableHandle {
            owner,
            inner: callable,
        }
    }

    pub fn owner(&self) -> EngineId {
        self.owner
    }

    /// Invoke the callable, failing if `caller` is not the owning engine.
    pub fn call(&self, caller: EngineId, args: &[Value]) -> Result<Vec<Value>, CoreError> {
        if caller != self.owner {
            return Err(CoreError::CrossEngineInvocation(format!(
                "callable owned by {} invoked from {}",
                self.owner, caller
            )));
        }
        self.inner.call(args)
    }

    /// Invoke the callable on a freshly minted worker engine, bypassing the
    /// owner check.
    ///
    /// This is the one sanctioned bypass: `spawn`/`pool`/`timeout` all
    /// create a brand new [`crate::engine::ScriptEngine`] specifically to
    /// run this callable, "implicitly copying the callable's bytecode via
    /// the shared function object" (§9 design note) rather than invoking
    /// it from within its defining engine's live call stack. Direct,
    /// caller-supplied invocation must go through [`CallableHandle::call`]
    /// instead.
    pub fn invoke_for_task(&self, args: &[Value]) -> Result<Vec<Value>, CoreError> {
        self.inner.call(args)
    }
}

impl fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallableHandle(owner={})", self.owner)
    }
}

/// Opaque reference to a core primitive (channel, pool, mutex, ...).
///
/// Identity is `Arc` pointer identity, never value identity — two
/// `OpaqueHandle`s are "the same handle" iff they share the same backing
/// allocation, regardless of what that allocation currently contains.
#[derive(Clone)]
pub struct OpaqueHandle {
    kind: &'static str,
    inner: Arc<dyn std::any::Any + Send + Sync>,
}

impl OpaqueHandle {
    pub fn new(kind: &'static str, inner: Arc<dyn std::any::Any + Send + Sync>) -> Self {
        OpaqueHandle { kind, inner }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn downcast<T: 'static>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    pub fn is_same(&self, other: &OpaqueHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueHandle(kind={})", self.kind)
    }
}

/// The universal typed datum exchanged across the script/native boundary.
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Callable(CallableHandle),
    Handle(OpaqueHandle),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// True for the leaf variants that are safe to move between engines
    /// without copying (§3: "Only immutable leaf variants ... are safe to
    /// transmit between engines without deep copy").
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Value::Nil | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// Produce a value safe to hand to a receiving engine: leaves are
    /// cloned cheaply, containers are recursively deep-copied, and
    /// reference types (`Callable`/`Handle`) keep their identity — only the
    /// reference itself is duplicated, never the thing it points to.
    pub fn deep_copy_for_send(&self) -> Value {
        match self {
            Value::Nil => Value::Nil,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::String(s.clone()),
            Value::List(items) => {
                Value::List(items.iter().map(Value::deep_copy_for_send).collect())
            }
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy_for_send()))
                    .collect(),
            ),
            Value::Callable(c) => Value::Callable(c.clone()),
            Value::Handle(h) => Value::Handle(h.clone()),
        }
    }

    /// Round to the nearest integer (half-to-even), for the call sites that
    /// document integer-rounding of a `Number` (sleep/timeout millisecond
    /// arguments, pool worker counts — §4.1).
    pub fn round_to_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => {
                let rounded = round_half_to_even(*n);
                if rounded.is_finite() {
                    Some(rounded as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

fn round_half_to_even(n: f64) -> f64 {
    let floor = n.floor();
    let diff = n - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}
