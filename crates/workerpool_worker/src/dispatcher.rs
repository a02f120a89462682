// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _};
use workerpool_protocol::{
    HostMessage, RESERVED_METHODS, SerializedError, TaskId, WorkerMessage, decode_host_message,
    encode_frame, is_reserved_method,
};

use crate::context::{AbortListener, TaskContext};
use crate::registry::{MethodFn, Registry};

/// What a caller driving [`Dispatcher::run_stdio`] or [`Dispatcher::run_channel`] should do
/// after [`Dispatcher::handle_one`] returns.
pub enum HandledMessage {
    /// Send this message back to the host.
    Reply(WorkerMessage),
    /// Nothing to send (reserved for future message kinds with no response).
    NoReply,
    /// Stop the run loop and exit the worker with this code (`None` means success).
    Exit(Option<i32>),
}

/// Builds a [`Dispatcher`] by registering callable methods.
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: Registry,
}

impl DispatcherBuilder {
    /// Registers `handler` under `name`. Panics in debug builds if `name` collides with a
    /// reserved method name (`__workerpool-*__`).
    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(Vec<serde_json::Value>, &TaskContext) -> Result<serde_json::Value, SerializedError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        let name = name.into();
        debug_assert!(!is_reserved_method(&name), "'{name}' is a reserved method name");
        self.registry.insert(name, Arc::new(handler) as MethodFn);
        self
    }

    /// Finalizes the registry into a runnable [`Dispatcher`].
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let (event_tx, event_rx) = async_channel::unbounded();
        Dispatcher {
            registry: self.registry,
            abort_listeners: Arc::new(DashMap::new()),
            cleaned_up: Arc::new(DashSet::new()),
            event_tx,
            event_rx,
        }
    }
}

/// The worker-side RPC loop: decodes requests, invokes the registered method (or runs the
/// CLEANUP/TERMINATE protocol phases), and encodes the response.
///
/// [`run_stdio`][Self::run_stdio] and [`run_channel`][Self::run_channel] are the only two ways
/// to drive a `Dispatcher`; both funnel every request through [`handle_one`][Self::handle_one],
/// except a `Task` request, which is handed to [`spawn_task`][Self::spawn_task] instead so a
/// long-running method can never stall the read loop from observing a concurrent CLEANUP or
/// TERMINATE. `Dispatcher` is cheap to clone: every field is an `Arc` or a channel handle, so a
/// clone shares the same registry, abort-listener/cleanup bookkeeping, and outbound channel as
/// the original.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    abort_listeners: Arc<DashMap<TaskId, Vec<AbortListener>>>,
    cleaned_up: Arc<DashSet<TaskId>>,
    event_tx: async_channel::Sender<WorkerMessage>,
    event_rx: async_channel::Receiver<WorkerMessage>,
}

impl Dispatcher {
    /// Starts building a dispatcher with no methods registered.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Runs `message` to completion and reports what the caller should do with the result. For
    /// a `Task`, this blocks until the registered method returns; [`run_stdio`][Self::run_stdio]
    /// and [`run_channel`][Self::run_channel] never call this for a `Task` message directly —
    /// they use [`spawn_task`][Self::spawn_task] instead, so that a long-running method cannot
    /// stall the read loop from observing a concurrent CLEANUP or TERMINATE. This method remains
    /// the right entry point for a caller that genuinely wants to await one task in isolation.
    pub async fn handle_one(&self, message: HostMessage) -> HandledMessage {
        match message {
            HostMessage::Task { id, method, params, transfer: _ } => {
                HandledMessage::Reply(self.run_task(id, &method, params).await)
            }
            HostMessage::Dynamic { id, .. } => HandledMessage::Reply(WorkerMessage::Error {
                id,
                error: SerializedError::new(
                    "UnsupportedOperation",
                    "this worker binary has no embedded scripting engine; dynamic tasks only \
                     run directly in the in-process thread backend, never over the wire",
                ),
            }),
            HostMessage::Cleanup { id, target_task_id } => {
                self.run_abort_listeners(target_task_id);
                self.cleaned_up.insert(target_task_id);
                HandledMessage::Reply(WorkerMessage::CleanupComplete { id, target_task_id })
            }
            HostMessage::Terminate { code, .. } => HandledMessage::Exit(code),
        }
    }

    async fn run_task(&self, id: TaskId, method: &str, params: Vec<serde_json::Value>) -> WorkerMessage {
        if method == RESERVED_METHODS {
            return WorkerMessage::Success {
                id,
                result: serde_json::Value::from(self.registry.names()),
                transfer: Vec::new(),
            };
        }
        if is_reserved_method(method) {
            return WorkerMessage::Error {
                id,
                error: SerializedError::new(
                    "MethodNotFound",
                    format!("'{method}' is a reserved name and cannot be invoked as a task"),
                ),
            };
        }
        let Some(method_fn) = self.registry.get(method).cloned() else {
            return WorkerMessage::Error {
                id,
                error: SerializedError::new("MethodNotFound", format!("no method registered for '{method}'")),
            };
        };
        let context = self.context_for(id);
        let outcome = tokio::task::spawn_blocking(move || method_fn(params, &context))
            .await
            .unwrap_or_else(|join_error| {
                Err(SerializedError::from_std_error("WorkerPanic", &join_error))
            });
        self.abort_listeners.remove(&id);
        match outcome {
            Ok(result) => WorkerMessage::Success { id, result, transfer: Vec::new() },
            Err(error) => WorkerMessage::Error { id, error },
        }
    }

    /// Runs a `Task` on a clone of this dispatcher without blocking the caller, delivering the
    /// eventual reply through the same outbound channel [`TaskContext::emit`] uses for this
    /// task's events. The read loop that called this stays free to observe a CLEANUP for this
    /// (or any other) task while the method is still running — `self.event_rx` is drained in the
    /// same `select!` branch for both, so a CLEANUP's abort listeners always get a chance to run
    /// (and an in-flight `emit` always gets forwarded) well before the task settles.
    fn spawn_task(&self, id: TaskId, method: String, params: Vec<serde_json::Value>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let reply = dispatcher.run_task(id, &method, params).await;
            let _ = dispatcher.event_tx.send(reply).await;
        });
    }

    fn run_abort_listeners(&self, target_task_id: TaskId) {
        if let Some((_, listeners)) = self.abort_listeners.remove(&target_task_id) {
            for listener in listeners {
                listener();
            }
        }
    }

    fn context_for(&self, task_id: TaskId) -> TaskContext {
        let event_tx = self.event_tx.clone();
        TaskContext::new(
            task_id,
            Arc::clone(&self.abort_listeners),
            Arc::clone(&self.cleaned_up),
            Arc::new(move |task_id, payload| {
                let _ = event_tx.try_send(WorkerMessage::Event { task_id, payload });
            }),
        )
    }

    /// Drives the dispatcher over newline-delimited JSON on stdin/stdout, used by a worker
    /// spawned as an OS process. Sends `Ready` once, then loops until stdin closes or a
    /// `TERMINATE` request is received, at which point the process exits with the requested
    /// code. A `Task` line is handed to [`spawn_task`][Self::spawn_task] rather than awaited
    /// inline, so stdin keeps being read (and a CLEANUP/TERMINATE line keeps being acted on)
    /// while the task's method runs.
    pub async fn run_stdio(self) {
        let mut stdout = tokio::io::stdout();
        self.write_stdio(&mut stdout, &WorkerMessage::Ready).await;

        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => match decode_host_message(&line) {
                            Ok(HostMessage::Task { id, method, params, transfer: _ }) => {
                                self.spawn_task(id, method, params);
                            }
                            Ok(message) => match self.handle_one(message).await {
                                HandledMessage::Reply(reply) => self.write_stdio(&mut stdout, &reply).await,
                                HandledMessage::NoReply => {}
                                HandledMessage::Exit(code) => std::process::exit(code.unwrap_or(0)),
                            },
                            Err(error) => tracing::warn!(%error, "dropping malformed frame from host"),
                        },
                        Ok(None) => break,
                        Err(error) => {
                            tracing::warn!(%error, "stdin read failed, exiting");
                            break;
                        }
                    }
                }
                Ok(event) = self.event_rx.recv() => {
                    self.write_stdio(&mut stdout, &event).await;
                }
            }
        }
    }

    /// Drives the dispatcher over a pair of typed [`async_channel`]s, used when the worker runs
    /// as an in-process OS thread sharing the host's address space. A `Task` message is handed
    /// to [`spawn_task`][Self::spawn_task] rather than awaited inline, so `inbound` keeps being
    /// read (and a CLEANUP/TERMINATE keeps being acted on) while the task's method runs.
    pub async fn run_channel(
        self,
        inbound: async_channel::Receiver<HostMessage>,
        outbound: async_channel::Sender<WorkerMessage>,
    ) {
        let _ = outbound.send(WorkerMessage::Ready).await;
        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Ok(message) = message else { break };
                    match message {
                        HostMessage::Task { id, method, params, transfer: _ } => {
                            self.spawn_task(id, method, params);
                        }
                        other => match self.handle_one(other).await {
                            HandledMessage::Reply(reply) => {
                                if outbound.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            HandledMessage::NoReply => {}
                            HandledMessage::Exit(_code) => break,
                        }
                    }
                }
                Ok(event) = self.event_rx.recv() => {
                    if outbound.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    async fn write_stdio(&self, stdout: &mut tokio::io::Stdout, message: &WorkerMessage) {
        if let Ok(frame) = encode_frame(message) {
            let _ = stdout.write_all(frame.as_bytes()).await;
            let _ = stdout.flush().await;
        }
    }
}
