// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The error taxonomy: one struct per failure kind, gathered under one umbrella [`PoolError`].

use std::time::Duration;

use workerpool_protocol::SerializedError;

/// Bad options or arguments, raised synchronously at construction or submission. Never reaches
/// a worker.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// A free-form validation failure.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// An option bag contained a key the pool does not recognize.
    #[must_use]
    pub fn unknown_option(key: &str) -> Self {
        Self::new(format!("unknown pool option '{key}'"))
    }

    /// A numeric option was outside its required range.
    #[must_use]
    pub fn out_of_range(option: &str, requirement: &str) -> Self {
        Self::new(format!("option '{option}' must be {requirement}"))
    }

    /// `workerType: "web"` (or any other backend the host cannot actually drive) was requested.
    #[must_use]
    pub fn unsupported_backend(backend: &str) -> Self {
        Self::new(format!("worker backend '{backend}' is not available in this host"))
    }

    /// A dynamic (stringified-function) task was submitted against a pool whose backend cannot
    /// marshal executable code across the worker boundary (the process backend).
    #[must_use]
    pub fn dynamic_task_unsupported() -> Self {
        Self::new(
            "dynamic tasks (ad-hoc closures) are only supported by the in-process thread \
             backend; the OS-process backend cannot marshal executable code across a process \
             boundary",
        )
    }
}

/// Submission would exceed `maxQueueSize`.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("task queue is full (maxQueueSize = {max_queue_size})")]
pub struct QueueFullError {
    /// The configured bound that was hit.
    pub max_queue_size: usize,
}

/// The caller requested cancellation.
#[derive(Debug, Clone, Copy, Default, thiserror::Error)]
#[error("task was cancelled")]
pub struct CancellationError;

/// A deferred cancellation fired because the task's timeout elapsed before it settled.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("task exceeded its {timeout:?} timeout")]
pub struct TimeoutError {
    /// The timeout duration that elapsed.
    pub timeout: Duration,
}

/// A task was dropped because its worker, or the pool itself, is being torn down.
#[derive(Debug, Clone, thiserror::Error)]
#[error("task was terminated{}", cause.as_deref().map(|c| format!(": {c}")).unwrap_or_default())]
pub struct TerminateError {
    /// The underlying exit signal or user-initiated termination reason, when known.
    pub cause: Option<String>,
}

impl TerminateError {
    /// A termination with no further detail available.
    #[must_use]
    pub const fn new() -> Self {
        Self { cause: None }
    }

    /// A termination caused by `cause` (an exit signal, or "pool shutdown", etc.).
    #[must_use]
    pub fn with_cause(cause: impl Into<String>) -> Self {
        Self { cause: Some(cause.into()) }
    }
}

impl Default for TerminateError {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker exited abnormally, or emitted an uncaught error outside of any task's scope.
#[derive(Debug, Clone, thiserror::Error)]
#[error("worker failed{}: {detail}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
pub struct WorkerError {
    /// The process/thread exit code, if one was observed.
    pub exit_code: Option<i32>,
    /// A human-readable description of what was observed (signal, panic message, closed channel).
    pub detail: String,
}

/// The user's method itself threw; the serialized payload is surfaced faithfully to the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct TaskError(#[from] pub SerializedError);

/// The umbrella error type for every way a [`Pool`][crate::Pool] operation can fail.
///
/// Specific variants expose additional detail; future versions may add variants.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`QueueFullError`].
    #[error(transparent)]
    QueueFull(#[from] QueueFullError),
    /// See [`CancellationError`].
    #[error(transparent)]
    Cancelled(#[from] CancellationError),
    /// See [`TimeoutError`].
    #[error(transparent)]
    TimedOut(#[from] TimeoutError),
    /// See [`TerminateError`].
    #[error(transparent)]
    Terminated(#[from] TerminateError),
    /// See [`WorkerError`].
    #[error(transparent)]
    Worker(#[from] WorkerError),
    /// See [`TaskError`].
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl PoolError {
    /// Shorthand for wrapping a worker-thrown [`SerializedError`] as a [`PoolError::Task`].
    #[must_use]
    pub fn from_task_failure(error: SerializedError) -> Self {
        Self::Task(TaskError(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminate_error_renders_cause_when_present() {
        let err = TerminateError::with_cause("pool shutdown");
        assert_eq!(err.to_string(), "task was terminated: pool shutdown");
    }

    #[test]
    fn terminate_error_renders_plainly_without_cause() {
        let err = TerminateError::new();
        assert_eq!(err.to_string(), "task was terminated");
    }

    #[test]
    fn pool_error_converts_from_each_kind() {
        let _: PoolError = ValidationError::new("bad").into();
        let _: PoolError = QueueFullError { max_queue_size: 1 }.into();
        let _: PoolError = CancellationError.into();
        let _: PoolError = TimeoutError { timeout: Duration::from_millis(1) }.into();
        let _: PoolError = TerminateError::new().into();
        let _: PoolError = WorkerError { exit_code: Some(1), detail: "crash".into() }.into();
        let _: PoolError = TaskError(SerializedError::new("Error", "boom")).into();
    }
}
