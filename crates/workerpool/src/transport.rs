// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The backend-specific half of a [`WorkerHandler`][crate::handler::WorkerHandler]: getting a
//! [`HostMessage`] to a worker and a [`WorkerMessage`] back, however that worker is isolated.
//!
//! One state machine (in [`crate::handler`]) drives either backend through the same small
//! surface — `post`/`recv`/`kill`/`wait` — rather than the handler branching on backend type
//! itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use workerpool_protocol::{HostMessage, WorkerMessage, decode_worker_message, encode_frame};
use workerpool_worker::Dispatcher;

use crate::error::WorkerError;

/// Which isolation primitive backs a [`WorkerHandler`][crate::handler::WorkerHandler].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerType {
    /// Picks the best backend available; always resolves to [`Self::Thread`] on this host,
    /// since an in-process OS thread is always available where an OS process might not be
    /// (sandboxed environments without `fork`/`exec`).
    #[default]
    Auto,
    /// An in-process OS thread running a [`Dispatcher`] that shares the host's address space.
    Thread,
    /// A forked OS child process communicating over newline-delimited JSON on stdio.
    Process,
    /// A browser worker agent. Recognized as an option value for wire/API compatibility but
    /// never constructible: there is no browser event loop to drive from a server-side binary.
    Web,
}

/// A factory the pool calls once per [`WorkerType::Thread`] worker to build its dispatcher.
/// Each worker gets its own instance because a [`Dispatcher`] carries per-worker abort-listener
/// state; only the registered methods themselves are shared (cheaply, via `Arc` closures).
pub type DispatcherFactory = Arc<dyn Fn() -> Dispatcher + Send + Sync>;

enum Kind {
    Thread {
        to_worker: async_channel::Sender<HostMessage>,
        from_worker: async_channel::Receiver<WorkerMessage>,
        join_handle: Option<std::thread::JoinHandle<()>>,
    },
    Process {
        child: Child,
        stdin: ChildStdin,
        lines: Lines<BufReader<ChildStdout>>,
    },
}

/// The live connection to one worker, hiding whether it is an OS thread or an OS process.
pub struct Transport {
    kind: Kind,
}

impl Transport {
    /// Spawns an in-process worker thread running a dispatcher built by `dispatcher_factory`.
    pub fn spawn_thread(dispatcher_factory: DispatcherFactory) -> Self {
        let (to_worker_tx, to_worker_rx) = async_channel::unbounded::<HostMessage>();
        let (from_worker_tx, from_worker_rx) = async_channel::unbounded::<WorkerMessage>();

        let join_handle = std::thread::Builder::new()
            .name("workerpool-worker".to_owned())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to start worker thread runtime");
                let dispatcher = dispatcher_factory();
                runtime.block_on(dispatcher.run_channel(to_worker_rx, from_worker_tx));
            })
            .expect("failed to spawn worker thread");

        Self {
            kind: Kind::Thread {
                to_worker: to_worker_tx,
                from_worker: from_worker_rx,
                join_handle: Some(join_handle),
            },
        }
    }

    /// Spawns a worker as a forked OS process running `command`, wiring its stdio for framed
    /// JSON exchange. `command`'s stdio is overridden regardless of what the caller configured.
    pub fn spawn_process(mut command: Command) -> Result<Self, WorkerError> {
        command
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn().map_err(|error| WorkerError {
            exit_code: None,
            detail: format!("failed to spawn worker process: {error}"),
        })?;
        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");
        let lines = BufReader::new(stdout).lines();

        Ok(Self { kind: Kind::Process { child, stdin, lines } })
    }

    /// Sends `message` to the worker.
    pub async fn post(&mut self, message: &HostMessage) -> Result<(), WorkerError> {
        match &mut self.kind {
            Kind::Thread { to_worker, .. } => {
                to_worker.send(message.clone()).await.map_err(|_closed| WorkerError {
                    exit_code: None,
                    detail: "worker thread's inbound channel is closed".to_owned(),
                })
            }
            Kind::Process { stdin, .. } => {
                let frame = encode_frame(message).expect("HostMessage always serializes to JSON");
                stdin.write_all(frame.as_bytes()).await.map_err(|error| WorkerError {
                    exit_code: None,
                    detail: format!("failed writing to worker stdin: {error}"),
                })?;
                stdin.flush().await.map_err(|error| WorkerError {
                    exit_code: None,
                    detail: format!("failed flushing worker stdin: {error}"),
                })
            }
        }
    }

    /// Waits for the next message from the worker, or `None` once the worker has gone away.
    /// Malformed frames from a process worker are logged and skipped rather than treated as the
    /// worker exiting.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        match &mut self.kind {
            Kind::Thread { from_worker, .. } => from_worker.recv().await.ok(),
            Kind::Process { lines, .. } => loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match decode_worker_message(&line) {
                        Ok(message) => return Some(message),
                        Err(error) => tracing::warn!(%error, "dropping malformed frame from worker"),
                    },
                    Ok(None) | Err(_) => return None,
                }
            },
        }
    }

    /// Forcibly tears down the worker without waiting for it to exit on its own.
    pub fn kill(&mut self) {
        match &mut self.kind {
            Kind::Thread { to_worker, .. } => to_worker.close(),
            Kind::Process { child, .. } => {
                let _ = child.start_kill();
            }
        }
    }

    /// Waits for the worker to finish exiting after [`kill`][Self::kill] or a graceful
    /// TERMINATE round-trip.
    pub async fn wait(&mut self) {
        match &mut self.kind {
            Kind::Thread { join_handle, .. } => {
                if let Some(handle) = join_handle.take() {
                    let _ = tokio::task::spawn_blocking(move || handle.join()).await;
                }
            }
            Kind::Process { child, .. } => {
                let _ = child.wait().await;
            }
        }
    }

    /// Whether this transport is backed by an OS process (dynamic tasks are unsupported here).
    #[must_use]
    pub const fn is_process(&self) -> bool {
        matches!(self.kind, Kind::Process { .. })
    }

    /// Reaps the worker's exit code after [`recv`][Self::recv] has returned `None`. For the
    /// in-process thread backend there is no process exit status to report, so this always
    /// returns `None` there; for a process backend it awaits the child (which has already
    /// closed its stdout by the time `recv` observed EOF, so this resolves promptly).
    pub async fn exit_code(&mut self) -> Option<i32> {
        match &mut self.kind {
            Kind::Thread { .. } => None,
            Kind::Process { child, .. } => child.wait().await.ok().and_then(|status| status.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use workerpool_worker::Dispatcher;

    use super::*;

    fn echo_factory() -> DispatcherFactory {
        Arc::new(|| Dispatcher::builder().method("echo", |params, _ctx| Ok(params.into_iter().next().unwrap_or(serde_json::Value::Null))).build())
    }

    #[tokio::test]
    async fn thread_transport_round_trips_ready_then_a_task() {
        let mut transport = Transport::spawn_thread(echo_factory());

        let ready = transport.recv().await;
        assert!(matches!(ready, Some(WorkerMessage::Ready)));

        transport
            .post(&HostMessage::Task { id: 1, method: "echo".to_owned(), params: vec![json!(5)], transfer: Vec::new() })
            .await
            .unwrap();

        match transport.recv().await {
            Some(WorkerMessage::Success { id, result, .. }) => {
                assert_eq!(id, 1);
                assert_eq!(result, json!(5));
            }
            other => panic!("unexpected message: {other:?}"),
        }

        transport.kill();
        transport.wait().await;
    }
}
