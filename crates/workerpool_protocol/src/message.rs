// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LegacyMessage, ProtocolError, SerializedError, TransferHandle};

/// An identifier for a single request, unique per [`WorkerHandler`][handler] and strictly
/// increasing within it.
///
/// [handler]: https://docs.rs/workerpool/latest/workerpool/struct.WorkerHandler.html
pub type RequestId = u64;

/// An identifier for the task a [`HostMessage::Cleanup`] or [`WorkerMessage::Event`] refers to.
///
/// Shares the same id space as [`RequestId`]: it is simply the id of the original task request.
pub type TaskId = u64;

/// A message sent from the host to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// Invoke a named method registered in the worker's method registry.
    Task {
        /// Correlates the eventual response.
        id: RequestId,
        /// The registered method name.
        method: String,
        /// Positional arguments.
        params: Vec<Value>,
        /// Buffers to hand off with zero-copy semantics where the backend supports it.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transfer: Vec<TransferHandle>,
    },
    /// Compile and run a function body sent as source text.
    ///
    /// Only ever produced for the in-process thread backend; see
    /// `workerpool::error::ValidationError::DynamicTaskUnsupported`.
    Dynamic {
        /// Correlates the eventual response.
        id: RequestId,
        /// The function source, passed through a controlled compilation entry point rather
        /// than an implicit-scope eval.
        code: String,
        /// Positional arguments.
        params: Vec<Value>,
        /// Buffers to hand off with zero-copy semantics where the backend supports it.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transfer: Vec<TransferHandle>,
    },
    /// Run any registered abort listeners for `target_task_id`.
    Cleanup {
        /// Correlates the eventual [`WorkerMessage::CleanupComplete`].
        id: RequestId,
        /// The task whose abort listeners should run.
        target_task_id: TaskId,
    },
    /// Ask the worker to exit.
    Terminate {
        /// Correlates the eventual exit, if the worker acknowledges before exiting.
        id: RequestId,
        /// Optional process/thread exit code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
    },
}

/// A message sent from a worker to the host, solicited or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    /// Sent exactly once, after the worker has finished loading and is ready for tasks.
    Ready,
    /// A task completed successfully.
    Success {
        /// The request id this responds to.
        id: RequestId,
        /// The method's return value.
        result: Value,
        /// Buffers returned untouched to the caller.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transfer: Vec<TransferHandle>,
    },
    /// A task failed.
    Error {
        /// The request id this responds to.
        id: RequestId,
        /// The structural error payload.
        error: SerializedError,
    },
    /// Acknowledges that a [`HostMessage::Cleanup`] finished running its abort listeners.
    CleanupComplete {
        /// The request id of the originating `Cleanup` message.
        id: RequestId,
        /// The task the cleanup was for.
        target_task_id: TaskId,
    },
    /// A custom event emitted by a running task via `workerEmit`.
    Event {
        /// The task currently running on the worker.
        task_id: TaskId,
        /// Arbitrary, task-defined payload.
        payload: Value,
    },
    /// Captured standard output, if stream forwarding is enabled.
    Stdout {
        /// Raw bytes of output, decoded as UTF-8 on a best-effort basis by the caller.
        data: String,
    },
    /// Captured standard error, if stream forwarding is enabled.
    Stderr {
        /// Raw bytes of output, decoded as UTF-8 on a best-effort basis by the caller.
        data: String,
    },
}

/// Encodes a message as one newline-delimited JSON frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if serialization fails (this should not normally
/// happen for well-formed messages made of JSON-representable values).
pub fn encode_frame<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decodes one frame as a [`HostMessage`], falling back to the legacy untagged shape.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the frame matches neither shape.
pub fn decode_host_message(frame: &str) -> Result<HostMessage, ProtocolError> {
    if let Ok(tagged) = serde_json::from_str::<HostMessage>(frame) {
        return Ok(tagged);
    }
    let legacy: LegacyMessage = serde_json::from_str(frame)?;
    Ok(legacy.into_host_message())
}

/// Decodes one frame as a [`WorkerMessage`], falling back to the legacy untagged shape.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the frame matches neither shape.
pub fn decode_worker_message(frame: &str) -> Result<WorkerMessage, ProtocolError> {
    if let Ok(tagged) = serde_json::from_str::<WorkerMessage>(frame) {
        return Ok(tagged);
    }
    let legacy: LegacyMessage = serde_json::from_str(frame)?;
    legacy.into_worker_message()
}
