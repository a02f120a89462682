// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Task`]: a unit of work as it sits in the [`TaskQueue`][crate::queue::TaskQueue] or a
//! [`WorkerHandler`][crate::handler::WorkerHandler]'s processing set.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use workerpool_protocol::{RequestId, TransferHandle};

use crate::future::Settler;
use crate::queue::Prioritized;

/// How a task's body is resolved to something a worker can run.
#[derive(Clone)]
pub enum Method {
    /// A name looked up in the worker's method registry.
    Named(String),
    /// A thread-backend-only closure, run directly in the worker thread's address space. See
    /// [`ValidationError::dynamic_task_unsupported`][crate::error::ValidationError::dynamic_task_unsupported]
    /// for why the process backend refuses this variant.
    Dynamic(Arc<dyn Fn(Vec<Value>) -> Result<Value, workerpool_protocol::SerializedError> + Send + Sync>),
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Per-task emission sink for worker-originated events received while the task is in flight.
pub type EventSink = Arc<dyn Fn(Value) + Send + Sync>;

/// A unit of work, from submission until it is completed, cancelled, or orphaned by a worker's
/// death.
///
/// Ownership mirrors the protocol: the [`Pool`][crate::Pool] exclusively owns a `Task` from
/// submission until it is handed to a [`WorkerHandler`][crate::handler::WorkerHandler]'s `exec`,
/// which then owns it until settlement.
pub struct Task {
    /// Assigned once the handler accepts the task for dispatch; `None` while still queued.
    pub request_id: Option<RequestId>,
    /// The callable body.
    pub method: Method,
    /// Positional arguments.
    pub params: Vec<Value>,
    /// Wall-clock budget measured from dispatch (not from submission); queue time never counts
    /// against it.
    pub timeout: Option<Duration>,
    /// Buffers to move rather than copy across the worker boundary, where the backend supports
    /// it.
    pub transfer: Vec<TransferHandle>,
    /// The resolver for this task's [`PoolFuture`][crate::future::PoolFuture]. Consumed exactly
    /// once: by the handler on response correlation, or by cancellation/termination.
    pub settler: Settler<Value>,
    /// Invoked for every `EVENT` message the worker emits while this task is active.
    pub on_event: Option<EventSink>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("transfer_count", &self.transfer.len())
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Builds a task invoking a named worker-registry method.
    #[must_use]
    pub fn named(method: impl Into<String>, params: Vec<Value>, settler: Settler<Value>) -> Self {
        Self {
            request_id: None,
            method: Method::Named(method.into()),
            params,
            timeout: None,
            transfer: Vec::new(),
            settler,
            on_event: None,
        }
    }

    /// Sets the dispatch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches buffers to hand off alongside the call.
    #[must_use]
    pub fn with_transfer(mut self, transfer: Vec<TransferHandle>) -> Self {
        self.transfer = transfer;
        self
    }

    /// Registers a sink for worker-emitted events scoped to this task.
    #[must_use]
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.on_event = Some(sink);
        self
    }
}

/// Tasks carry no intrinsic ordering by default; pools using [`QueueStrategy::Priority`] pair a
/// `Task` with a caller-supplied priority via [`PrioritizedTask`].
///
/// [`QueueStrategy::Priority`]: crate::queue::QueueStrategy::Priority
impl Prioritized for Task {}

/// Wraps a [`Task`] with an explicit priority for use in a priority [`TaskQueue`][queue].
///
/// [queue]: crate::queue::TaskQueue
#[derive(Debug)]
pub struct PrioritizedTask {
    /// The wrapped task.
    pub task: Task,
    /// Lower values dequeue first under the default ordering.
    pub priority: i64,
}

impl Prioritized for PrioritizedTask {
    fn priority(&self) -> i64 {
        self.priority
    }
}
