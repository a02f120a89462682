// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(missing_docs)]

//! Wire protocol shared by the `workerpool` host crate and the `workerpool_worker`
//! dispatcher crate.
//!
//! Messages are discriminated structured objects (a `type` tag) in both directions.
//! A legacy, untagged shape is also understood on decode for backward compatibility
//! with older worker scripts, matching the historical `{id, method, params, result,
//! error}` wire shape.

mod error;
mod legacy;
mod message;
mod reserved;
mod transfer;

pub use error::SerializedError;
pub use legacy::LegacyMessage;
pub use message::{HostMessage, RequestId, TaskId, WorkerMessage, decode_host_message, decode_worker_message, encode_frame};
pub use reserved::{
    RESERVED_CLEANUP, RESERVED_HEARTBEAT, RESERVED_METHODS, RESERVED_TERMINATE, is_reserved_method,
};
pub use transfer::{Transfer, TransferHandle};

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The frame could not be parsed as either the tagged or the legacy shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
static_assertions::assert_impl_all!(HostMessage: Send, Sync, Clone);
#[cfg(test)]
static_assertions::assert_impl_all!(WorkerMessage: Send, Sync, Clone);
#[cfg(test)]
static_assertions::assert_impl_all!(ProtocolError: Send, Sync, std::error::Error);
