// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`WorkerHandler`]: owns the lifecycle and message protocol for exactly one worker.
//!
//! The handler runs as a background actor task that exclusively owns its [`Transport`] and
//! processing set; the [`Pool`][crate::Pool] only ever talks to it through the cheaply cloneable
//! `WorkerHandler` handle and the [`HandlerEvent`] stream it emits.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use workerpool_protocol::{HostMessage, RequestId, TaskId, WorkerMessage};

use crate::error::{PoolError, TerminateError, ValidationError, WorkerError};
use crate::future::Settler;
use crate::task::{EventSink, Method, Task};
use crate::transport::{DispatcherFactory, Transport, WorkerType};

/// Lifecycle state of one [`WorkerHandler`]: `{booting, idle, busy, cleaning, terminating,
/// terminated}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Worker process/thread spawned; waiting for its `Ready` message.
    Booting,
    /// Ready and processing set empty.
    Idle,
    /// Processing set non-empty.
    Busy,
    /// A CLEANUP round-trip is in flight for a cancelled or timed-out task.
    Cleaning,
    /// Tearing down; will not accept new work.
    Terminating,
    /// Backend confirmed exit.
    Terminated,
}

/// What happened to a [`WorkerHandler`], for the [`Pool`][crate::Pool]'s dispatch loop to react
/// to.
#[derive(Debug)]
pub enum HandlerEvent {
    /// The worker answered its `Ready` message; warmup/readiness latches can progress.
    Ready { handler_id: u64 },
    /// The processing set became empty after previously being non-empty; a good time to call
    /// `_next()` again.
    BecameIdle { handler_id: u64 },
    /// The worker exited (cleanly or not) while tasks were still in its processing set; those
    /// tasks have already been rejected.
    Crashed { handler_id: u64, error: WorkerError },
    /// The worker reached the `terminated` state after a graceful or forced shutdown.
    Terminated { handler_id: u64 },
}

enum Command {
    Exec(Task),
    Cleanup { target_task_id: TaskId },
    Terminate { force: bool, code: Option<i32> },
}

/// A completion produced without going through the wire protocol — used for
/// [`Method::Dynamic`] tasks, which run as a local `spawn_blocking` rather than a worker
/// round-trip.
struct LocalCompletion {
    request_id: RequestId,
    outcome: Result<Value, workerpool_protocol::SerializedError>,
}

struct InFlight {
    settler: Settler<Value>,
    on_event: Option<EventSink>,
    /// Fired when a `CleanupComplete` for this task arrives, to let the cancel hook's grace
    /// timer stop waiting early.
    cleanup_done: Option<tokio::sync::oneshot::Sender<()>>,
}

/// A handle to one worker's actor task. Cloning shares the same worker; cloned handles observe
/// the same [`state`][Self::state] and [`is_busy`][Self::is_busy].
#[derive(Clone)]
pub struct WorkerHandler {
    id: u64,
    worker_type: WorkerType,
    state: Arc<Mutex<HandlerState>>,
    processing_count: Arc<AtomicU64>,
    is_process: bool,
    commands: mpsc::UnboundedSender<Command>,
}

impl WorkerHandler {
    /// Spawns a worker of `worker_type` and starts its actor loop, emitting [`HandlerEvent`]s to
    /// `events`.
    pub fn spawn(
        id: u64,
        worker_type: WorkerType,
        dispatcher_factory: DispatcherFactory,
        process_command: Option<tokio::process::Command>,
        grace_period: Duration,
        clock: tick::Clock,
        events: mpsc::UnboundedSender<HandlerEvent>,
    ) -> Result<Self, PoolError> {
        let transport = match worker_type {
            WorkerType::Auto | WorkerType::Thread => Transport::spawn_thread(dispatcher_factory),
            WorkerType::Process => {
                let command = process_command.expect("process worker type requires a command");
                Transport::spawn_process(command).map_err(PoolError::Worker)?
            }
            WorkerType::Web => return Err(PoolError::Validation(ValidationError::unsupported_backend("web"))),
        };
        let is_process = transport.is_process();

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(HandlerState::Booting));
        let processing_count = Arc::new(AtomicU64::new(0));

        tokio::spawn(run_actor(
            id,
            transport,
            commands_rx,
            Arc::clone(&state),
            Arc::clone(&processing_count),
            grace_period,
            clock,
            commands_tx.clone(),
            events,
        ));

        Ok(Self { id, worker_type, state, processing_count, is_process, commands: commands_tx })
    }

    /// This handler's pool-assigned id, stable for its lifetime.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The backend this handler is running.
    #[must_use]
    pub const fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    /// Whether this handler's processing set is non-empty.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.processing_count.load(Ordering::Acquire) > 0
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandlerState {
        *self.state.lock()
    }

    /// Whether this handler can accept a new task right now (ready and not draining).
    #[must_use]
    pub fn can_accept(&self) -> bool {
        matches!(self.state(), HandlerState::Idle | HandlerState::Busy)
    }

    /// Whether this handler's backend cannot run [`Method::Dynamic`] tasks.
    #[must_use]
    pub const fn rejects_dynamic_tasks(&self) -> bool {
        self.is_process
    }

    /// Hands `task` to this worker. Installs the task future's cancellation hook so a later
    /// `cancel()` (or an expiring dispatch-time timeout) triggers the CLEANUP/grace-timer/
    /// force-terminate sequence instead of an immediate rejection.
    pub fn exec(&self, task: Task) {
        let _ = self.commands.send(Command::Exec(task));
    }

    /// Requests a graceful (`force=false`) or immediate (`force=true`) shutdown.
    pub fn terminate(&self, force: bool, code: Option<i32>) {
        let _ = self.commands.send(Command::Terminate { force, code });
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_actor(
    id: u64,
    mut transport: Transport,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: Arc<Mutex<HandlerState>>,
    processing_count: Arc<AtomicU64>,
    grace_period: Duration,
    clock: tick::Clock,
    self_commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedSender<HandlerEvent>,
) {
    let mut processing: HashMap<RequestId, InFlight> = HashMap::new();
    let mut next_request_id: RequestId = 0;
    let mut pending_terminate: Option<Option<i32>> = None;
    let (local_done_tx, mut local_done_rx) = mpsc::unbounded_channel::<LocalCompletion>();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Exec(task) => {
                        let request_id = next_request_id;
                        next_request_id += 1;
                        dispatch(
                            &mut transport,
                            &mut processing,
                            &processing_count,
                            &state,
                            request_id,
                            task,
                            grace_period,
                            &clock,
                            self_commands.clone(),
                            local_done_tx.clone(),
                        )
                        .await;
                    }
                    Command::Cleanup { target_task_id } => {
                        *state.lock() = HandlerState::Cleaning;
                        let _ = transport.post(&HostMessage::Cleanup { id: next_request_id, target_task_id }).await;
                        next_request_id += 1;
                    }
                    Command::Terminate { force, code } => {
                        if force || processing.is_empty() {
                            terminate_now(&mut transport, &state, &events, id, code, &mut processing).await;
                            break;
                        }
                        pending_terminate = Some(code);
                    }
                }
            }
            Some(completion) = local_done_rx.recv() => {
                let outcome = completion.outcome.map_err(PoolError::from_task_failure);
                settle_one(&mut processing, &processing_count, completion.request_id, outcome);
                if processing.is_empty() {
                    finish_idle_cycle(&mut transport, &state, &events, id, &mut pending_terminate).await;
                }
            }
            message = transport.recv() => {
                let Some(message) = message else {
                    let exit_code = transport.exit_code().await;
                    crash(&mut processing, &processing_count, &state, &events, id, exit_code, "worker channel closed").await;
                    break;
                };
                match message {
                    WorkerMessage::Ready => {
                        let mut guard = state.lock();
                        if *guard == HandlerState::Booting {
                            *guard = HandlerState::Idle;
                        }
                        drop(guard);
                        let _ = events.send(HandlerEvent::Ready { handler_id: id });
                    }
                    WorkerMessage::Success { id: request_id, result, .. } => {
                        settle_one(&mut processing, &processing_count, request_id, Ok(result));
                        if processing.is_empty() {
                            finish_idle_cycle(&mut transport, &state, &events, id, &mut pending_terminate).await;
                        }
                    }
                    WorkerMessage::Error { id: request_id, error } => {
                        settle_one(&mut processing, &processing_count, request_id, Err(PoolError::from_task_failure(error)));
                        if processing.is_empty() {
                            finish_idle_cycle(&mut transport, &state, &events, id, &mut pending_terminate).await;
                        }
                    }
                    WorkerMessage::CleanupComplete { target_task_id, .. } => {
                        if let Some(in_flight) = processing.get_mut(&target_task_id) {
                            if let Some(sender) = in_flight.cleanup_done.take() {
                                let _ = sender.send(());
                            }
                        }
                    }
                    WorkerMessage::Event { task_id, payload } => {
                        if let Some(task) = processing.get(&task_id) {
                            if let Some(sink) = &task.on_event {
                                sink(payload);
                            }
                        }
                    }
                    WorkerMessage::Stdout { .. } | WorkerMessage::Stderr { .. } => {}
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    transport: &mut Transport,
    processing: &mut HashMap<RequestId, InFlight>,
    processing_count: &Arc<AtomicU64>,
    state: &Arc<Mutex<HandlerState>>,
    request_id: RequestId,
    mut task: Task,
    grace_period: Duration,
    clock: &tick::Clock,
    commands: mpsc::UnboundedSender<Command>,
    local_done: mpsc::UnboundedSender<LocalCompletion>,
) {
    task.request_id = Some(request_id);
    if let Some(timeout) = task.timeout {
        task.settler.schedule_timeout(timeout);
    }

    let (cleanup_done_tx, cleanup_done_rx) = tokio::sync::oneshot::channel::<()>();
    let grace_clock = clock.clone();
    task.settler.on_cancel(move |reason, finisher| {
        tokio::spawn(async move {
            let _ = commands.send(Command::Cleanup { target_task_id: request_id });
            tokio::select! {
                _ = cleanup_done_rx => {}
                () = tick::Delay::new(&grace_clock, grace_period) => {}
            }
            let _ = commands.send(Command::Terminate { force: true, code: None });
            finisher.settle(reason);
        });
    });

    match task.method {
        Method::Named(name) => {
            let message =
                HostMessage::Task { id: request_id, method: name, params: task.params, transfer: task.transfer };
            if transport.post(&message).await.is_err() {
                return;
            }
            processing.insert(
                request_id,
                InFlight { settler: task.settler, on_event: task.on_event, cleanup_done: Some(cleanup_done_tx) },
            );
            *state.lock() = HandlerState::Busy;
            processing_count.fetch_add(1, Ordering::AcqRel);
        }
        Method::Dynamic(closure) => {
            // Thread backend only (the Pool validates this before a process-backed handler ever
            // sees a dynamic task). Runs directly in this process, since there is nothing to
            // marshal across an address-space boundary that does not exist.
            processing.insert(
                request_id,
                InFlight { settler: task.settler, on_event: task.on_event, cleanup_done: Some(cleanup_done_tx) },
            );
            *state.lock() = HandlerState::Busy;
            processing_count.fetch_add(1, Ordering::AcqRel);

            let params = task.params;
            tokio::spawn(async move {
                let outcome = tokio::task::spawn_blocking(move || closure(params)).await.unwrap_or_else(|join_error| {
                    Err(workerpool_protocol::SerializedError::from_std_error("WorkerPanic", &join_error))
                });
                let _ = local_done.send(LocalCompletion { request_id, outcome });
            });
        }
    }
}

fn settle_one(
    processing: &mut HashMap<RequestId, InFlight>,
    processing_count: &Arc<AtomicU64>,
    request_id: RequestId,
    outcome: Result<Value, PoolError>,
) {
    if let Some(in_flight) = processing.remove(&request_id) {
        processing_count.fetch_sub(1, Ordering::AcqRel);
        match outcome {
            Ok(value) => in_flight.settler.resolve(value),
            Err(error) => in_flight.settler.reject(error),
        }
    }
}

async fn finish_idle_cycle(
    transport: &mut Transport,
    state: &Arc<Mutex<HandlerState>>,
    events: &mpsc::UnboundedSender<HandlerEvent>,
    id: u64,
    pending_terminate: &mut Option<Option<i32>>,
) {
    if let Some(code) = pending_terminate.take() {
        terminate_now(transport, state, events, id, code, &mut HashMap::new()).await;
    } else {
        *state.lock() = HandlerState::Idle;
        let _ = events.send(HandlerEvent::BecameIdle { handler_id: id });
    }
}

async fn terminate_now(
    transport: &mut Transport,
    state: &Arc<Mutex<HandlerState>>,
    events: &mpsc::UnboundedSender<HandlerEvent>,
    id: u64,
    code: Option<i32>,
    processing: &mut HashMap<RequestId, InFlight>,
) {
    *state.lock() = HandlerState::Terminating;
    for (_, in_flight) in processing.drain() {
        in_flight.settler.reject(PoolError::Terminated(TerminateError::with_cause("pool shutdown")));
    }
    let _ = transport.post(&HostMessage::Terminate { id: 0, code }).await;
    transport.kill();
    transport.wait().await;
    *state.lock() = HandlerState::Terminated;
    let _ = events.send(HandlerEvent::Terminated { handler_id: id });
}

async fn crash(
    processing: &mut HashMap<RequestId, InFlight>,
    processing_count: &Arc<AtomicU64>,
    state: &Arc<Mutex<HandlerState>>,
    events: &mpsc::UnboundedSender<HandlerEvent>,
    id: u64,
    exit_code: Option<i32>,
    detail: &str,
) {
    let error = WorkerError { exit_code, detail: detail.to_owned() };
    for (_, in_flight) in processing.drain() {
        processing_count.fetch_sub(1, Ordering::AcqRel);
        in_flight.settler.reject(PoolError::Worker(error.clone()));
    }
    *state.lock() = HandlerState::Terminated;
    let _ = events.send(HandlerEvent::Crashed { handler_id: id, error });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::task::Task;
    use crate::transport::DispatcherFactory;

    fn echo_factory() -> DispatcherFactory {
        Arc::new(|| {
            workerpool_worker::Dispatcher::builder()
                .method("echo", |params, _ctx| Ok(params.into_iter().next().unwrap_or(Value::Null)))
                .build()
        })
    }

    #[tokio::test]
    async fn exec_resolves_through_the_whole_round_trip() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let clock = tick::Clock::new_tokio();
        let handler = WorkerHandler::spawn(
            1,
            WorkerType::Thread,
            echo_factory(),
            None,
            Duration::from_millis(200),
            clock.clone(),
            events_tx,
        )
        .unwrap();

        assert!(matches!(events_rx.recv().await, Some(HandlerEvent::Ready { handler_id: 1 })));

        let (future, settler) = crate::future::root::<Value>(clock);
        handler.exec(Task::named("echo", vec![json!(9)], settler));

        assert_eq!(future.await.unwrap(), json!(9));
        assert!(matches!(events_rx.recv().await, Some(HandlerEvent::BecameIdle { handler_id: 1 })));
    }
}
