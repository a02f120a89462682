// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde_json::Value;
use workerpool_protocol::TaskId;

pub(crate) type AbortListener = Box<dyn FnOnce() + Send>;

/// Passed to every registered method call. Lets the method register cleanup callbacks that run
/// when the host requests cancellation, and emit custom events scoped to its own task id.
///
/// Events emitted after the task's cleanup has already completed are silently dropped: the user
/// method may keep running uninterruptibly for a while after a CLEANUP request (this is exactly
/// why the handler terminates the worker afterwards), and by then nothing on the host side is
/// listening for this task id any more.
pub struct TaskContext {
    task_id: TaskId,
    abort_listeners: Arc<DashMap<TaskId, Vec<AbortListener>>>,
    cleaned_up: Arc<DashSet<TaskId>>,
    emit: Arc<dyn Fn(TaskId, Value) + Send + Sync>,
}

impl TaskContext {
    pub(crate) fn new(
        task_id: TaskId,
        abort_listeners: Arc<DashMap<TaskId, Vec<AbortListener>>>,
        cleaned_up: Arc<DashSet<TaskId>>,
        emit: Arc<dyn Fn(TaskId, Value) + Send + Sync>,
    ) -> Self {
        Self { task_id, abort_listeners, cleaned_up, emit }
    }

    /// The request id of the task this context belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Registers `listener` to run when this task receives a CLEANUP request. Multiple
    /// listeners may be registered; all run, in registration order, before cleanup-complete is
    /// sent.
    pub fn on_abort(&self, listener: impl FnOnce() + Send + 'static) {
        self.abort_listeners
            .entry(self.task_id)
            .or_default()
            .push(Box::new(listener));
    }

    /// Emits a custom event scoped to this task. Dropped silently if cleanup for this task has
    /// already completed.
    pub fn emit(&self, payload: Value) {
        if !self.cleaned_up.contains(&self.task_id) {
            (self.emit)(self.task_id, payload);
        }
    }
}
