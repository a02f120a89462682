// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`PoolFuture`], the cancellable, timeout-bearing future returned by every task submission.
//!
//! Cancellation forms a bidirectional parent/child graph rather than a single callback: calling
//! [`PoolFuture::cancel`] anywhere in a chain walks up to the root, settles the root exactly once
//! (terminal states are absorbing, so a second `cancel()` is a no-op), then broadcasts the same
//! rejection back down to every descendant so sibling continuations observe it too.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{CancellationError, PoolError, TerminateError, TimeoutError};

/// Graph node tracking settlement and the parent/child links used for cancellation propagation.
/// Deliberately untyped: the payload type only lives in [`TypedCore`], reached through the
/// type-erased `reject` closure, so one node type serves every `PoolFuture<T>`.
struct Shared {
    parent: Option<Arc<Shared>>,
    children: Mutex<Vec<Weak<Shared>>>,
    settled: AtomicBool,
    clock: tick::Clock,
    /// Installed by the creator (the [`WorkerHandler`][handler]) on a root future only; invoked
    /// with the triggering reason in place of an immediate rejection, so a cleanup round-trip
    /// can run first and settle the future itself once that round-trip concludes.
    ///
    /// [handler]: crate::handler::WorkerHandler
    cancel_hook: Mutex<Option<Box<dyn FnOnce(PoolError, Finisher) + Send>>>,
    reject: Box<dyn Fn(PoolError) + Send + Sync>,
}

/// Handed to an installed cancel hook so it can deliver the eventual settlement once its own
/// (possibly asynchronous) cleanup sequence concludes, without re-running the pending → settled
/// guard a second time — that guard already ran before the hook was invoked.
pub struct Finisher {
    shared: Arc<Shared>,
}

impl Finisher {
    /// Delivers `err` as the future's final value. Exactly one of a `Finisher`'s use or the
    /// normal resolve/reject path wins; whichever runs first is authoritative, since the node
    /// was already marked settled before this `Finisher` was created.
    pub fn settle(self, err: PoolError) {
        self.shared.reject_now(err);
    }
}

impl Shared {
    fn root(self: &Arc<Self>) -> Arc<Self> {
        let mut node = Arc::clone(self);
        while let Some(parent) = node.parent.clone() {
            node = parent;
        }
        node
    }

    /// Attempts the pending → settled transition. Returns whether this call performed it, so
    /// callers can guard against the re-entrancy a naive cancellation graph would loop on.
    fn try_settle(&self) -> bool {
        self.settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn reject_now(&self, err: PoolError) {
        (self.reject)(err);
    }

    fn broadcast_reject(&self, err: &PoolError) {
        let children: Vec<Weak<Shared>> = self.children.lock().clone();
        for weak in children {
            if let Some(child) = weak.upgrade() {
                if child.try_settle() {
                    child.reject_now(err.clone());
                }
                child.broadcast_reject(err);
            }
        }
    }
}

/// Walks to the root, settles it (running its cancel hook if one is installed, otherwise
/// rejecting it directly with `err`), then broadcasts `err` to every live descendant.
fn propagate_terminal(node: &Arc<Shared>, err: PoolError) {
    let root = node.root();
    if root.try_settle() {
        if let Some(hook) = root.cancel_hook.lock().take() {
            hook(err.clone(), Finisher { shared: Arc::clone(&root) });
        } else {
            root.reject_now(err.clone());
        }
    }
    root.broadcast_reject(&err);
}

struct TypedCore<T> {
    sender: Mutex<Option<oneshot::Sender<Result<T, PoolError>>>>,
}

/// A cancellable, timeout-bearing future. Returned to the caller on task submission and threaded
/// through [`WorkerHandler`][handler] internals as the resolver for in-flight work.
///
/// Consuming combinators ([`then`][Self::then], [`map`][Self::map], [`always`][Self::always],
/// [`finally`][Self::finally]) take `self` by value and return a new, linked `PoolFuture`; this
/// is the Rust-idiomatic rendition of "observe returns a child future" — a `PoolFuture` has a
/// single owner at a time rather than the multi-observer semantics of a JS promise.
///
/// [handler]: crate::handler::WorkerHandler
pub struct PoolFuture<T> {
    receiver: oneshot::Receiver<Result<T, PoolError>>,
    shared: Arc<Shared>,
}

/// The resolver half of a [`PoolFuture`], held by whoever owns the in-flight work (a queued
/// [`Task`][crate::task::Task] or a continuation spawned by [`PoolFuture::then`]).
pub struct Settler<T> {
    typed: Arc<TypedCore<T>>,
    shared: Arc<Shared>,
}

fn new_node<T: Send + 'static>(
    parent: Option<Arc<Shared>>,
    clock: tick::Clock,
) -> (PoolFuture<T>, Settler<T>, Arc<Shared>) {
    let (tx, rx) = oneshot::channel::<Result<T, PoolError>>();
    let typed = Arc::new(TypedCore { sender: Mutex::new(Some(tx)) });
    let typed_for_reject = Arc::clone(&typed);
    let shared = Arc::new(Shared {
        parent,
        children: Mutex::new(Vec::new()),
        settled: AtomicBool::new(false),
        clock,
        cancel_hook: Mutex::new(None),
        reject: Box::new(move |err| {
            if let Some(sender) = typed_for_reject.sender.lock().take() {
                let _ = sender.send(Err(err));
            }
        }),
    });
    (
        PoolFuture { receiver: rx, shared: Arc::clone(&shared) },
        Settler { typed, shared: Arc::clone(&shared) },
        shared,
    )
}

/// Creates a new root future with no parent. Used by the [`Pool`][crate::Pool] for every freshly
/// submitted task. `clock` drives every timeout scheduled anywhere in this future's chain.
#[must_use]
pub fn root<T: Send + 'static>(clock: tick::Clock) -> (PoolFuture<T>, Settler<T>) {
    let (future, settler, _shared) = new_node(None, clock);
    (future, settler)
}

impl<T> Settler<T> {
    /// Settles the future with a successful value. A no-op if it was already settled (for
    /// example by a concurrent [`PoolFuture::cancel`]).
    pub fn resolve(self, value: T) {
        if self.shared.try_settle() {
            if let Some(sender) = self.typed.sender.lock().take() {
                let _ = sender.send(Ok(value));
            }
        }
    }

    /// Settles the future with a failure. A no-op if it was already settled.
    pub fn reject(self, err: PoolError) {
        if self.shared.try_settle() {
            self.shared.reject_now(err);
        }
    }

    /// Installs the cancellation hook: a callback invoked with the triggering reason
    /// (cancellation or timeout) in place of an immediate rejection, when [`PoolFuture::cancel`]
    /// or [`PoolFuture::set_timeout`] reaches this future's root. The
    /// [`WorkerHandler`][crate::handler::WorkerHandler] uses this to issue a CLEANUP request and
    /// defer settlement until the worker confirms it (or a grace timer expires).
    pub fn on_cancel(&self, hook: impl FnOnce(PoolError, Finisher) + Send + 'static) {
        *self.shared.cancel_hook.lock() = Some(Box::new(hook));
    }

    /// Whether this future's root has already settled — for example because a task still sitting
    /// in the queue was cancelled before a worker ever picked it up. The dispatch loop checks
    /// this so it never hands an already-cancelled task to a worker.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.root().settled.load(Ordering::Acquire)
    }

    /// Schedules a deferred cancellation after `timeout`, as if the caller had called
    /// [`PoolFuture::set_timeout`] on the paired future. Used by
    /// [`WorkerHandler`][crate::handler::WorkerHandler]`::exec`, which only holds the `Settler`
    /// half by the time a task's dispatch-time timeout is known.
    pub fn schedule_timeout(&self, timeout: Duration) {
        let node = self.shared.root();
        let clock = node.clock.clone();
        tokio::spawn(async move {
            tick::Delay::new(&clock, timeout).await;
            propagate_terminal(&node, PoolError::TimedOut(TimeoutError { timeout }));
        });
    }
}

impl<T> PoolFuture<T> {
    /// Cancels this future. Idempotent: a second call after the first is a no-op because the
    /// root has already left the pending state.
    pub fn cancel(&self) {
        propagate_terminal(&self.shared, PoolError::Cancelled(CancellationError));
    }

    /// Schedules a deferred cancellation after `timeout` elapses, unless the future has already
    /// settled by then. Per contract this behaves as if installed on the root: a timeout set on
    /// a child future guards the whole chain, not just that link.
    pub fn set_timeout(&self, timeout: Duration) {
        let node = self.shared.root();
        let clock = node.clock.clone();
        tokio::spawn(async move {
            tick::Delay::new(&clock, timeout).await;
            propagate_terminal(&node, PoolError::TimedOut(TimeoutError { timeout }));
        });
    }
}

impl<T: Send + 'static> PoolFuture<T> {
    /// Chains a continuation, producing a new future linked to this one for cancellation
    /// propagation — this future's "observe" operation.
    pub fn then<U, F, Fut>(self, f: F) -> PoolFuture<U>
    where
        F: FnOnce(Result<T, PoolError>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U, PoolError>> + Send + 'static,
        U: Send + 'static,
    {
        let (child, settler, _shared) = new_node(Some(Arc::clone(&self.shared)), self.shared.clock.clone());
        self.shared.children.lock().push(Arc::downgrade(&_shared));
        tokio::spawn(async move {
            let outcome = self.await;
            match f(outcome).await {
                Ok(value) => settler.resolve(value),
                Err(err) => settler.reject(err),
            }
        });
        child
    }

    /// Maps a successful value; rejections pass through unchanged.
    pub fn map<U, F>(self, f: F) -> PoolFuture<U>
    where
        F: FnOnce(T) -> U + Send + 'static,
        U: Send + 'static,
    {
        self.then(move |res| async move { res.map(f) })
    }

    /// Runs `f` regardless of outcome; its return value does not replace the settlement.
    #[must_use]
    pub fn always<F>(self, f: F) -> PoolFuture<T>
    where
        F: FnOnce() + Send + 'static,
    {
        self.then(move |res| async move {
            f();
            res
        })
    }

    /// Like [`always`][Self::always], except `f` may itself fail; if it does, that failure
    /// replaces the upstream settlement (success or failure alike).
    #[must_use]
    pub fn finally<F>(self, f: F) -> PoolFuture<T>
    where
        F: FnOnce() -> Result<(), PoolError> + Send + 'static,
    {
        self.then(move |res| async move {
            match f() {
                Ok(()) => res,
                Err(err) => Err(err),
            }
        })
    }
}

impl<T> Future for PoolFuture<T> {
    type Output = Result<T, PoolError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|outcome| match outcome {
            Ok(settlement) => settlement,
            Err(_dropped) => Err(PoolError::Terminated(TerminateError::with_cause(
                "resolver was dropped without settling the future",
            ))),
        })
    }
}
