// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Pool`]: task admission, the queue, worker creation/selection, and drain/terminate
//! orchestration.
//!
//! Every dispatch decision (`_next()` in spec terms) runs on one dedicated background task —
//! `submit` and the worker-event pump only ever send a wake signal — so the pool never needs
//! re-entrancy guards around handler selection, mirroring how the host side is meant to behave
//! as "single-threaded cooperative" even though this Rust rendition is itself running on a
//! multi-threaded executor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_once_cell::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use workerpool_protocol::{RESERVED_METHODS, SerializedError};

use crate::error::{PoolError, QueueFullError, TerminateError, ValidationError};
use crate::events::PoolEvent;
use crate::future::{self, PoolFuture, Settler};
use crate::handler::{HandlerEvent, WorkerHandler};
use crate::options::{CreateWorkerHook, MinWorkers, PoolOptions, WorkerSpawnOverrides};
use crate::proxy::MethodProxy;
use crate::queue::{Prioritized, QueueStrategy, TaskQueue};
use crate::stats::PoolStats;
use crate::task::{EventSink, Method, Task};
use crate::transport::{DispatcherFactory, WorkerType};

/// Per-call overrides for [`Pool::exec_with`], beyond the method name and parameters.
#[derive(Default)]
pub struct ExecOptions {
    /// Dequeue priority, used only when the pool's [`QueueStrategy`] is
    /// [`QueueStrategy::Priority`]. Lower values dequeue first under the default comparator.
    pub priority: i64,
    /// Wall-clock budget measured from dispatch, not from submission.
    pub timeout: Option<Duration>,
    /// Buffers to hand off with zero-copy semantics where the backend supports it.
    pub transfer: Vec<workerpool_protocol::TransferHandle>,
    /// Invoked for every custom event the worker emits while this task is active.
    pub on_event: Option<EventSink>,
}

struct QueuedTask {
    task: Task,
    task_id: u64,
    priority: i64,
}

impl Prioritized for QueuedTask {
    fn priority(&self) -> i64 {
        self.priority
    }
}

struct TerminationState {
    settler: Option<Settler<()>>,
    remaining: usize,
}

struct ReadyState {
    remaining: usize,
    waiters: Vec<Settler<()>>,
}

struct Inner {
    options: PoolOptions,
    clock: tick::Clock,
    dispatcher_factory: Option<DispatcherFactory>,
    on_create_worker: Option<CreateWorkerHook>,
    handlers: Mutex<Vec<WorkerHandler>>,
    queue: Mutex<TaskQueue<QueuedTask>>,
    next_worker_id: AtomicU64,
    next_task_id: AtomicU64,
    events_tx: broadcast::Sender<PoolEvent>,
    handler_events_tx: mpsc::UnboundedSender<HandlerEvent>,
    dispatch_wake_tx: mpsc::UnboundedSender<()>,
    terminating: AtomicBool,
    termination: Mutex<TerminationState>,
    ready: Mutex<ReadyState>,
    /// Single-flight cache for [`Pool::proxy`]: concurrent first calls await the same
    /// introspection round trip instead of each issuing their own.
    proxy_methods: OnceCell<Arc<[String]>>,
}

/// The host-side coordinator: owns the task queue and the set of worker handlers, and drives
/// admission, dispatch, and shutdown.
///
/// Cloning a `Pool` shares the same underlying state; the last clone dropped does not
/// automatically terminate workers — call [`terminate`][Self::terminate] explicitly.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<Inner>,
}

/// Builds a [`Pool`], validating [`PoolOptions`] and wiring a method registry (for
/// [`WorkerType::Thread`]/[`WorkerType::Auto`]) or a process template (for
/// [`WorkerType::Process`]) before any worker is spawned.
#[derive(Default)]
pub struct PoolBuilder {
    options: PoolOptions,
    dispatcher_factory: Option<DispatcherFactory>,
    on_create_worker: Option<CreateWorkerHook>,
}

impl PoolBuilder {
    /// Starts a builder with [`PoolOptions::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Workers eagerly constructed once [`build`][Self::build] succeeds. Accepts either a fixed
    /// count or [`MinWorkers::Max`] to warm up to `max_workers`.
    #[must_use]
    pub fn min_workers(mut self, min_workers: impl Into<MinWorkers>) -> Self {
        self.options.min_workers = min_workers.into();
        self
    }

    /// Upper bound on concurrently live workers.
    #[must_use]
    pub const fn max_workers(mut self, count: usize) -> Self {
        self.options.max_workers = count;
        self
    }

    /// Upper bound on queued-but-undispatched tasks.
    #[must_use]
    pub const fn max_queue_size(mut self, count: usize) -> Self {
        self.options.max_queue_size = Some(count);
        self
    }

    /// Dequeue discipline for tasks waiting on a worker.
    #[must_use]
    pub const fn queue_strategy(mut self, strategy: QueueStrategy) -> Self {
        self.options.queue_strategy = strategy;
        self
    }

    /// Isolation backend new workers use.
    #[must_use]
    pub const fn worker_type(mut self, worker_type: WorkerType) -> Self {
        self.options.worker_type = worker_type;
        self
    }

    /// How long a handler waits for a worker to acknowledge cleanup before force-terminating it.
    #[must_use]
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.options.grace_period_ms = u64::try_from(grace_period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Configures the program, fixed arguments, and fixed environment for
    /// [`WorkerType::Process`] workers.
    #[must_use]
    pub fn process_command(
        mut self,
        program: impl Into<String>,
        args: Vec<String>,
        envs: Vec<(String, String)>,
    ) -> Self {
        self.options.process_program = Some(program.into());
        self.options.process_args = args;
        self.options.process_envs = envs;
        self
    }

    /// Registers the method table [`WorkerType::Thread`]/[`WorkerType::Auto`] workers run.
    /// Required unless `worker_type` is [`WorkerType::Process`].
    #[must_use]
    pub fn dispatcher_factory(mut self, factory: DispatcherFactory) -> Self {
        self.dispatcher_factory = Some(factory);
        self
    }

    /// Registers a hook called before each worker is spawned, to let the caller adjust its
    /// command-line/environment on a per-worker basis.
    #[must_use]
    pub fn on_create_worker(mut self, hook: CreateWorkerHook) -> Self {
        self.on_create_worker = Some(hook);
        self
    }

    /// Validates the accumulated options and constructs the pool, eagerly warming up
    /// `min_workers` handlers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Validation`] if the options are inconsistent, or propagates the
    /// first warmup worker's spawn failure.
    pub fn build(self) -> Result<Pool, PoolError> {
        self.options.validate()?;
        if matches!(self.options.worker_type, WorkerType::Auto | WorkerType::Thread) && self.dispatcher_factory.is_none()
        {
            return Err(PoolError::Validation(ValidationError::new(
                "worker_type resolves to an in-process thread backend but no dispatcher_factory was configured",
            )));
        }

        let (events_tx, _events_rx) = broadcast::channel(1024);
        let (handler_events_tx, handler_events_rx) = mpsc::unbounded_channel();
        let (dispatch_wake_tx, dispatch_wake_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            clock: tick::Clock::new_tokio(),
            dispatcher_factory: self.dispatcher_factory,
            on_create_worker: self.on_create_worker,
            handlers: Mutex::new(Vec::new()),
            queue: Mutex::new(TaskQueue::with_strategy(self.options.queue_strategy)),
            next_worker_id: AtomicU64::new(0),
            next_task_id: AtomicU64::new(0),
            events_tx,
            handler_events_tx,
            dispatch_wake_tx,
            terminating: AtomicBool::new(false),
            termination: Mutex::new(TerminationState { settler: None, remaining: 0 }),
            ready: Mutex::new(ReadyState {
                remaining: self.options.min_workers.resolve(self.options.max_workers),
                waiters: Vec::new(),
            }),
            proxy_methods: OnceCell::new(),
            options: self.options,
        });

        tokio::spawn(run_event_pump(Arc::clone(&inner), handler_events_rx));
        tokio::spawn(run_dispatch_pump(Arc::clone(&inner), dispatch_wake_rx));

        for _ in 0..inner.options.min_workers.resolve(inner.options.max_workers) {
            let handler = spawn_handler(&inner)?;
            inner.handlers.lock().push(handler);
        }

        Ok(Pool { inner })
    }
}

impl Pool {
    /// Starts a [`PoolBuilder`] with [`PoolOptions::default`].
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Submits a named-method task with default [`ExecOptions`].
    #[must_use]
    pub fn exec(&self, method: impl Into<String>, params: Vec<Value>) -> PoolFuture<Value> {
        self.exec_with(method, params, ExecOptions::default())
    }

    /// Submits a named-method task with explicit priority, timeout, transfer, and event-sink
    /// overrides.
    #[must_use]
    pub fn exec_with(&self, method: impl Into<String>, params: Vec<Value>, options: ExecOptions) -> PoolFuture<Value> {
        self.submit(Method::Named(method.into()), params, options)
    }

    /// Submits an ad-hoc closure. Only the in-process thread backend can run these; against a
    /// process-backed pool this rejects immediately with
    /// [`ValidationError::dynamic_task_unsupported`], before any queueing happens.
    #[must_use]
    pub fn exec_fn(
        &self,
        closure: impl Fn(Vec<Value>) -> Result<Value, SerializedError> + Send + Sync + 'static,
        params: Vec<Value>,
    ) -> PoolFuture<Value> {
        if self.inner.dispatcher_factory.is_none() {
            let (future, settler) = future::root(self.inner.clock.clone());
            settler.reject(PoolError::Validation(ValidationError::dynamic_task_unsupported()));
            return future;
        }
        self.submit(Method::Dynamic(Arc::new(closure)), params, ExecOptions::default())
    }

    fn submit(&self, method: Method, params: Vec<Value>, options: ExecOptions) -> PoolFuture<Value> {
        let (future, settler) = future::root(self.inner.clock.clone());

        if self.inner.terminating.load(Ordering::Acquire) {
            settler.reject(PoolError::Terminated(TerminateError::with_cause("pool is terminating")));
            return future;
        }

        let task_id = {
            let mut queue = self.inner.queue.lock();
            if let Some(max) = self.inner.options.max_queue_size {
                if queue.len() >= max {
                    settler.reject(PoolError::QueueFull(QueueFullError { max_queue_size: max }));
                    return future;
                }
            }
            let task_id = self.inner.next_task_id.fetch_add(1, Ordering::Relaxed);
            let task = Task {
                request_id: None,
                method,
                params,
                timeout: options.timeout,
                transfer: options.transfer,
                settler,
                on_event: options.on_event,
            };
            queue.push(QueuedTask { task, task_id, priority: options.priority });
            task_id
        };
        let _ = self.inner.dispatch_wake_tx.send(());

        let events_tx = self.inner.events_tx.clone();
        future.then(move |outcome| {
            let _ = events_tx.send(if outcome.is_ok() {
                PoolEvent::TaskComplete { task_id }
            } else {
                PoolEvent::TaskFail { task_id }
            });
            async move { outcome }
        })
    }

    /// A convenience over [`exec`][Self::exec]: resolves to a [`MethodProxy`] whose calls are
    /// validated against a worker's registered methods, discovered on first use via a
    /// `__workerpool-methods__` introspection call and cached for the life of the pool.
    /// Concurrent first calls share the single in-flight introspection round trip.
    #[must_use]
    pub fn proxy(&self) -> PoolFuture<MethodProxy> {
        let pool = self.clone();
        let inner = Arc::clone(&self.inner);
        let (future, settler) = future::root(inner.clock.clone());
        tokio::spawn(async move {
            let introspecting_pool = pool.clone();
            let outcome = inner
                .proxy_methods
                .get_or_try_init(async move {
                    introspecting_pool.exec(RESERVED_METHODS, Vec::new()).await.and_then(|value| {
                        serde_json::from_value::<Vec<String>>(value)
                            .map(Arc::<[String]>::from)
                            .map_err(|error| {
                                PoolError::Validation(ValidationError::new(format!(
                                    "worker's methods introspection reply was not a JSON array of strings: {error}"
                                )))
                            })
                    })
                })
                .await
                .map(Clone::clone);
            match outcome {
                Ok(methods) => settler.resolve(MethodProxy::new(pool, methods)),
                Err(err) => settler.reject(err),
            }
        });
        future
    }

    /// A snapshot of current load. See [`PoolStats`] for field semantics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let handlers = self.inner.handlers.lock();
        let busy_workers = handlers.iter().filter(|h| h.is_busy()).count();
        PoolStats {
            total_workers: handlers.len(),
            busy_workers,
            idle_workers: handlers.len() - busy_workers,
            pending_tasks: self.inner.queue.lock().len(),
            active_tasks: busy_workers,
            queued_bytes_estimate: None,
        }
    }

    /// Subscribes to the pool's observability event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events_tx.subscribe()
    }

    /// The clock driving every timeout issued anywhere in this pool's futures.
    #[must_use]
    pub(crate) fn clock(&self) -> tick::Clock {
        self.inner.clock.clone()
    }

    /// Resolves once every warmup (`min_workers`) worker has emitted `Ready`. Resolves
    /// immediately if there is no warmup to wait for.
    #[must_use]
    pub fn ready(&self) -> PoolFuture<()> {
        let mut ready = self.inner.ready.lock();
        let (future, settler) = future::root(self.inner.clock.clone());
        if ready.remaining == 0 {
            settler.resolve(());
        } else {
            ready.waiters.push(settler);
        }
        future
    }

    /// Tears the pool down. `force = false` waits for in-flight tasks to finish and rejects only
    /// the queue's undispatched tasks immediately; `force = true` rejects in-flight tasks too.
    /// Either way, no further submission is accepted once this is called, and the returned
    /// future resolves once every handler reaches the terminated state (bounded by `timeout`,
    /// after which any still-live handler is force-terminated).
    pub fn terminate(&self, force: bool, timeout: Duration) -> PoolFuture<()> {
        self.inner.terminating.store(true, Ordering::Release);

        for queued in self.inner.queue.lock().clear() {
            queued.task.settler.reject(PoolError::Terminated(TerminateError::with_cause("pool is terminating")));
        }

        let (future, settler) = future::root(self.inner.clock.clone());
        let handlers = self.inner.handlers.lock();
        if handlers.is_empty() {
            settler.resolve(());
            return future;
        }

        {
            let mut termination = self.inner.termination.lock();
            termination.settler = Some(settler);
            termination.remaining = handlers.len();
        }
        for handler in handlers.iter() {
            handler.terminate(force, None);
        }
        drop(handlers);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tick::Delay::new(&inner.clock, timeout).await;
            if inner.terminating.load(Ordering::Acquire) {
                for handler in inner.handlers.lock().iter() {
                    handler.terminate(true, None);
                }
            }
        });

        future
    }
}

fn spawn_handler(inner: &Arc<Inner>) -> Result<WorkerHandler, PoolError> {
    let id = inner.next_worker_id.fetch_add(1, Ordering::Relaxed);
    let overrides = inner.on_create_worker.as_ref().map_or_else(WorkerSpawnOverrides::default, |hook| hook(id));

    let process_command = matches!(inner.options.worker_type, WorkerType::Process).then(|| {
        let program = inner.options.process_program.as_deref().expect("validated at build()");
        let mut command = tokio::process::Command::new(program);
        command.args(inner.options.process_args.iter());
        command.args(overrides.extra_process_args.iter());
        for (key, value) in inner.options.process_envs.iter().chain(overrides.extra_envs.iter()) {
            command.env(key, value);
        }
        command
    });

    let dispatcher_factory = inner
        .dispatcher_factory
        .clone()
        .unwrap_or_else(|| Arc::new(|| workerpool_worker::Dispatcher::builder().build()));

    let handler = WorkerHandler::spawn(
        id,
        inner.options.worker_type,
        dispatcher_factory,
        process_command,
        inner.options.grace_period(),
        inner.clock.clone(),
        inner.handler_events_tx.clone(),
    )?;
    let _ = inner.events_tx.send(PoolEvent::WorkerCreated { worker_id: id });
    Ok(handler)
}

async fn run_dispatch_pump(inner: Arc<Inner>, mut wake_rx: mpsc::UnboundedReceiver<()>) {
    while wake_rx.recv().await.is_some() {
        while wake_rx.try_recv().is_ok() {}
        run_dispatch_pass(&inner);
    }
}

fn run_dispatch_pass(inner: &Arc<Inner>) {
    loop {
        let queue_has_work = !inner.queue.lock().is_empty();
        if !queue_has_work {
            return;
        }

        let handlers = inner.handlers.lock();
        let idle = handlers.iter().find(|h| h.can_accept() && !h.is_busy()).cloned();
        let handler_count = handlers.len();
        drop(handlers);

        let handler = match idle {
            Some(handler) => handler,
            None => {
                if handler_count >= inner.options.max_workers {
                    return;
                }
                match spawn_handler(inner) {
                    Ok(handler) => {
                        inner.handlers.lock().push(handler.clone());
                        handler
                    }
                    Err(error) => {
                        tracing::warn!(%error, "failed to spawn a worker handler; will retry on next wake");
                        return;
                    }
                }
            }
        };

        let Some(queued) = inner.queue.lock().pop() else { return };
        if queued.task.settler.is_settled() {
            // Cancelled (or timed out) while still queued; drop it without occupying a worker.
            continue;
        }
        let _ = inner.events_tx.send(PoolEvent::TaskStart { task_id: queued.task_id });
        handler.exec(queued.task);
    }
}

async fn run_event_pump(inner: Arc<Inner>, mut events_rx: mpsc::UnboundedReceiver<HandlerEvent>) {
    while let Some(event) = events_rx.recv().await {
        match event {
            HandlerEvent::Ready { .. } => {
                let mut ready = inner.ready.lock();
                if ready.remaining > 0 {
                    ready.remaining -= 1;
                    if ready.remaining == 0 {
                        for waiter in ready.waiters.drain(..) {
                            waiter.resolve(());
                        }
                    }
                }
                drop(ready);
                let _ = inner.dispatch_wake_tx.send(());
            }
            HandlerEvent::BecameIdle { .. } => {
                let _ = inner.dispatch_wake_tx.send(());
            }
            HandlerEvent::Crashed { handler_id, error } => {
                inner.handlers.lock().retain(|h| h.id() != handler_id);
                let _ = inner.events_tx.send(PoolEvent::WorkerError { worker_id: handler_id, error });
                note_handler_gone(&inner);
                let _ = inner.dispatch_wake_tx.send(());
            }
            HandlerEvent::Terminated { handler_id } => {
                inner.handlers.lock().retain(|h| h.id() != handler_id);
                let _ = inner.events_tx.send(PoolEvent::WorkerTerminated { worker_id: handler_id });
                note_handler_gone(&inner);
            }
        }
    }
}

fn note_handler_gone(inner: &Arc<Inner>) {
    let mut termination = inner.termination.lock();
    if termination.settler.is_some() {
        termination.remaining = termination.remaining.saturating_sub(1);
        if termination.remaining == 0 {
            if let Some(settler) = termination.settler.take() {
                settler.resolve(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::queue::QueueStrategy;

    fn echo_pool(max_workers: usize) -> Pool {
        let factory: DispatcherFactory = Arc::new(|| {
            workerpool_worker::Dispatcher::builder()
                .method("add", |params, _ctx| {
                    let a = params.first().and_then(Value::as_i64).unwrap_or(0);
                    let b = params.get(1).and_then(Value::as_i64).unwrap_or(0);
                    Ok(json!(a + b))
                })
                .build()
        });
        Pool::builder()
            .worker_type(WorkerType::Thread)
            .max_workers(max_workers)
            .dispatcher_factory(factory)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn basic_arithmetic_resolves() {
        let pool = echo_pool(2);
        let result = pool.exec("add", vec![json!(3), json!(4)]).await.unwrap();
        assert_eq!(result, json!(7));
        // Let the idle-event settle before inspecting stats.
        tokio::task::yield_now().await;
        assert_eq!(pool.stats().pending_tasks, 0);
    }

    #[tokio::test]
    async fn queue_full_rejects_synchronously() {
        let factory: DispatcherFactory = Arc::new(|| {
            workerpool_worker::Dispatcher::builder()
                .method("block", |_params, ctx| {
                    let (tx, rx) = std::sync::mpsc::channel::<()>();
                    ctx.on_abort(move || {
                        let _ = tx.send(());
                    });
                    let _ = rx.recv();
                    Ok(Value::Null)
                })
                .build()
        });
        let pool = Pool::builder()
            .worker_type(WorkerType::Thread)
            .max_workers(1)
            .max_queue_size(1)
            .dispatcher_factory(factory)
            .build()
            .unwrap();

        let busy = pool.exec("block", vec![]);
        tokio::task::yield_now().await;
        let _queued = pool.exec("block", vec![]);
        tokio::task::yield_now().await;

        let err = pool.exec("block", vec![]).await.unwrap_err();
        assert!(matches!(err, PoolError::QueueFull(_)));

        busy.cancel();
    }

    #[tokio::test]
    async fn priority_strategy_dequeues_lowest_first() {
        let factory: DispatcherFactory = Arc::new(|| {
            workerpool_worker::Dispatcher::builder()
                .method("slow", |_params, _ctx| {
                    std::thread::sleep(Duration::from_millis(50));
                    Ok(Value::Null)
                })
                .method("label", |params, _ctx| Ok(params.into_iter().next().unwrap()))
                .build()
        });
        let pool = Pool::builder()
            .worker_type(WorkerType::Thread)
            .max_workers(1)
            .queue_strategy(QueueStrategy::Priority)
            .dispatcher_factory(factory)
            .build()
            .unwrap();

        let warmup = pool.exec("slow", vec![]);
        tokio::task::yield_now().await;

        let low = pool.exec_with("label", vec![json!("p1")], ExecOptions { priority: 1, ..Default::default() });
        let mid = pool.exec_with("label", vec![json!("p5")], ExecOptions { priority: 5, ..Default::default() });
        let high = pool.exec_with("label", vec![json!("p10")], ExecOptions { priority: 10, ..Default::default() });

        warmup.await.unwrap();
        assert_eq!(low.await.unwrap(), json!("p1"));
        assert_eq!(mid.await.unwrap(), json!("p5"));
        assert_eq!(high.await.unwrap(), json!("p10"));
    }

    #[tokio::test]
    async fn graceful_terminate_resolves_after_in_flight_tasks() {
        let pool = echo_pool(2);
        let a = pool.exec("add", vec![json!(1), json!(1)]);
        let b = pool.exec("add", vec![json!(2), json!(2)]);

        let done = pool.terminate(false, Duration::from_secs(5));
        assert_eq!(a.await.unwrap(), json!(2));
        assert_eq!(b.await.unwrap(), json!(4));
        done.await.unwrap();

        let err = pool.exec("add", vec![json!(1), json!(1)]).await.unwrap_err();
        assert!(matches!(err, PoolError::Terminated(_)));
    }
}
