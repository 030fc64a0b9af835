//! Stable error taxonomy shared by every primitive in this crate.
//!
//! Mirrors the teacher crate's `CoreError` convention
//! (`spark-core::error::CoreError`): a small, `'static`-tagged enum with a
//! human message, so a host embedding can map failures back to a
//! script-level error table by `code()` alone, without string matching on
//! `Display`.

use thiserror::Error;

/// Error domain for every fallible operation exposed by this crate.
///
/// Variant-to-reason mapping follows the taxonomy in `spec.md` §7 exactly;
/// do not add ad-hoc variants for component-specific failures — reuse one of
/// these and carry detail in the message.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("closed: {0}")]
    Closed(String),

    #[error("full: {0}")]
    Full(String),

    #[error("empty: {0}")]
    Empty(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("task panic: {0}")]
    TaskPanic(String),

    #[error("cross-engine invocation: {0}")]
    CrossEngineInvocation(String),
}

impl CoreError {
    /// Stable, machine-readable tag for this error's taxonomy bucket.
    ///
    /// Intentionally independent from `Display`'s wording so host bindings
    /// can switch on `code()` without being coupled to message text.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgument(_) => "invalid_argument",
            CoreError::Closed(_) => "closed",
            CoreError::Full(_) => "full",
            CoreError::Empty(_) => "empty",
            CoreError::Timeout(_) => "timeout",
            CoreError::Cancelled(_) => "cancelled",
            CoreError::TaskPanic(_) => "task_panic",
            CoreError::CrossEngineInvocation(_) => "cross_engine_invocation",
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }

    pub fn closed(msg: impl Into<String>) -> Self {
        CoreError::Closed(msg.into())
    }

    pub fn full(msg: impl Into<String>) -> Self {
        CoreError::Full(msg.into())
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        CoreError::Empty(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        CoreError::Timeout(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        CoreError::Cancelled(msg.into())
    }

    pub fn task_panic(msg: impl Into<String>) -> Self {
        CoreError::TaskPanic(msg.into())
    }
}

/// Crate-wide result alias, analogous to the teacher's `crate::Result<T, E>`.
pub type CoreResult<T> = Result<T, CoreError>;
