// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`PoolEvent`]: observability notifications a [`Pool`][crate::Pool] emits alongside its
//! normal task-completion futures.
//!
//! Delivered over a [`tokio::sync::broadcast`] channel: fan-out is bounded and non-blocking, so
//! a slow or absent subscriber never stalls the dispatch loop (a lagging subscriber simply
//! misses older events, surfaced as [`tokio::sync::broadcast::error::RecvError::Lagged`]).

use crate::error::WorkerError;

/// An observability notification. See the module docs for delivery semantics.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A task was handed to a worker for execution.
    TaskStart {
        /// A pool-assigned sequence number, distinct from the wire-level request id a handler
        /// assigns at dispatch time; correlates this event with its eventual
        /// `TaskComplete`/`TaskFail`.
        task_id: u64,
    },
    /// A task resolved successfully.
    TaskComplete {
        /// See [`Self::TaskStart`].
        task_id: u64,
    },
    /// A task settled with any kind of failure (cancellation, timeout, worker crash, or the
    /// task's own thrown error).
    TaskFail {
        /// See [`Self::TaskStart`].
        task_id: u64,
    },
    /// A new worker handler was constructed.
    WorkerCreated {
        /// The handler's pool-assigned id.
        worker_id: u64,
    },
    /// A worker handler reached the terminated state.
    WorkerTerminated {
        /// The handler's pool-assigned id.
        worker_id: u64,
    },
    /// A worker exited abnormally or raised an uncaught error outside any task's scope.
    WorkerError {
        /// The handler's pool-assigned id.
        worker_id: u64,
        /// What was observed.
        error: WorkerError,
    },
}

/// A handle to a [`Pool`][crate::Pool]'s event stream. Wraps
/// [`tokio::sync::broadcast::Receiver`] under a crate-stable name.
pub type EventReceiver = tokio::sync::broadcast::Receiver<PoolEvent>;
